//! Serialized delivery onto the presentation context.

use tokio::sync::mpsc;

use crate::scheduler::Scheduler;
use crate::subscriptions::{LivenessToken, SubscriptionRegistry};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// FIFO of render jobs drained by a single task on the presentation context.
///
/// Jobs run strictly in enqueue order, one at a time. Each job re-checks its
/// liveness token right before running, so a job queued before its owner was
/// disposed is skipped. A job that already passed the check when another
/// context disposes the owner still runs to completion; disposal from within
/// a job takes effect for every later job.
#[derive(Clone, Debug)]
pub struct PresentationQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl PresentationQueue {
    /// Start the drain task under `registry`.
    pub fn start(scheduler: &Scheduler, registry: &SubscriptionRegistry) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        registry.spawn(scheduler, async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Self { tx }
    }

    /// Queue `job`, guarded by `token`.
    ///
    /// Returns false when the queue has already shut down.
    pub fn deliver<F>(&self, token: &LivenessToken, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let token = token.clone();
        self.tx
            .send(Box::new(move || {
                if token.is_live() {
                    job();
                } else {
                    tracing::trace!("suppressed delivery after disposal");
                }
            }))
            .is_ok()
    }
}
