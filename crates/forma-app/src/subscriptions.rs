//! Aggregate ownership of live subscriptions.
//!
//! Every task the pipeline spawns is tracked by a [`SubscriptionRegistry`].
//! Disposing a registry revokes its [`LivenessToken`] and aborts all of its
//! tasks, including those of child registries, in one call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::AbortHandle;

use crate::scheduler::Scheduler;

/// Cheap, cloneable liveness flag checked before every delivery.
///
/// A child token is live only while it and all of its ancestors are live.
#[derive(Clone, Debug)]
pub struct LivenessToken {
    live: Arc<AtomicBool>,
    parent: Option<Arc<LivenessToken>>,
}

impl LivenessToken {
    fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
            parent: None,
        }
    }

    fn child(&self) -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
            parent: Some(Arc::new(self.clone())),
        }
    }

    fn revoke(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Whether deliveries guarded by this token may still run.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
            && self.parent.as_ref().map_or(true, |parent| parent.is_live())
    }
}

/// Arena of subscription tasks released together.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    token: LivenessToken,
    handles: Mutex<Vec<AbortHandle>>,
    children: Mutex<Vec<Weak<SubscriptionRegistry>>>,
}

impl SubscriptionRegistry {
    /// Create an empty, live registry.
    pub fn new() -> Self {
        Self {
            token: LivenessToken::new(),
            handles: Mutex::new(Vec::new()),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Create a child registry disposed together with `self`.
    pub fn child(self: &Arc<Self>) -> Arc<SubscriptionRegistry> {
        let child = Arc::new(Self {
            token: self.token.child(),
            handles: Mutex::new(Vec::new()),
            children: Mutex::new(Vec::new()),
        });
        {
            let mut children = self.children.lock();
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child));
        }
        if !self.is_live() {
            child.dispose();
        }
        child
    }

    /// Spawn `fut` on `scheduler` and track it.
    ///
    /// Spawning on a disposed registry aborts the task immediately.
    pub fn spawn<F>(&self, scheduler: &Scheduler, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = scheduler.spawn(fut).abort_handle();
        // Liveness is checked under the lock `dispose` drains through.
        let mut handles = self.handles.lock();
        if !self.is_live() {
            handle.abort();
            return;
        }
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Token guarding deliveries made on behalf of this registry.
    pub fn token(&self) -> LivenessToken {
        self.token.clone()
    }

    /// Whether the registry (and all of its ancestors) is still live.
    pub fn is_live(&self) -> bool {
        self.token.is_live()
    }

    /// Number of tracked tasks that have not finished yet.
    pub fn active_tasks(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Revoke the token and abort every task, including those of children.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        self.token.revoke();
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
        let children: Vec<_> = self.children.lock().drain(..).collect();
        for child in children.iter().filter_map(Weak::upgrade) {
            child.dispose();
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispose_aborts_tasks_and_revokes_token() {
        let scheduler = Scheduler::current("test");
        let registry = SubscriptionRegistry::new();
        registry.spawn(&scheduler, futures::future::pending());
        assert_eq!(registry.active_tasks(), 1);

        let token = registry.token();
        registry.dispose();

        assert!(!token.is_live());
        assert_eq!(registry.active_tasks(), 0);
        registry.dispose();
    }

    #[tokio::test]
    async fn parent_dispose_reaches_children() {
        let parent = Arc::new(SubscriptionRegistry::new());
        let child = parent.child();
        let child_token = child.token();

        parent.dispose();

        assert!(!child_token.is_live());
        assert!(!child.is_live());
    }

    #[tokio::test]
    async fn child_dispose_leaves_parent_live() {
        let parent = Arc::new(SubscriptionRegistry::new());
        let child = parent.child();

        child.dispose();

        assert!(parent.is_live());
        assert!(!child.is_live());
    }

    #[tokio::test]
    async fn spawn_after_dispose_is_aborted() {
        let scheduler = Scheduler::current("test");
        let registry = SubscriptionRegistry::new();
        registry.dispose();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        registry.spawn(&scheduler, async move {
            let _ = tx.send(());
        });

        assert!(rx.await.is_err());
        assert_eq!(registry.active_tasks(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_dispose_leaves_no_tracked_task_running() {
        let scheduler = Scheduler::current("test");
        for _ in 0..200 {
            let parent = Arc::new(SubscriptionRegistry::new());
            let registry = parent.child();
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    for _ in 0..10 {
                        registry.spawn(&scheduler, futures::future::pending());
                    }
                });
                scope.spawn(|| parent.dispose());
            });
            assert!(!registry.is_live());
            assert_eq!(registry.active_tasks(), 0);
        }
    }
}
