//! Restartable producers controlled per subscription.

use forma_core::{
    EvaluationResult, EvaluationStream, FormId, ProducerError, RuleEvaluator, SectionSource,
    SectionStream, SectionViewModel,
};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::wait_for_count;

type Item<T> = Result<T, ProducerError>;

/// A producer whose every subscription is a separate, test-driven channel.
///
/// Subscriptions never end on their own. Items queued with
/// [`ScriptedProducer::replaying`] are sent to each new subscription first.
#[derive(Debug)]
pub struct ScriptedProducer<T> {
    replay: Vec<Item<T>>,
    subscriptions: Mutex<Vec<mpsc::UnboundedSender<Item<T>>>>,
    forms: Mutex<Vec<FormId>>,
    count: watch::Sender<usize>,
}

/// Scripted [`SectionSource`].
pub type ScriptedSectionSource = ScriptedProducer<Vec<SectionViewModel>>;

/// Scripted [`RuleEvaluator`].
pub type ScriptedRuleEvaluator = ScriptedProducer<EvaluationResult>;

impl<T: Clone + Send + 'static> ScriptedProducer<T> {
    /// Producer that emits nothing until told to.
    pub fn new() -> Self {
        Self::replaying(Vec::new())
    }

    /// Producer that replays `items` to every new subscription.
    pub fn replaying(items: Vec<Item<T>>) -> Self {
        let (count, _) = watch::channel(0);
        Self {
            replay: items,
            subscriptions: Mutex::new(Vec::new()),
            forms: Mutex::new(Vec::new()),
            count,
        }
    }

    fn subscribe(&self, form: &FormId) -> BoxStream<'static, Item<T>> {
        let (tx, rx) = mpsc::unbounded_channel();
        for item in &self.replay {
            let _ = tx.send(item.clone());
        }
        self.subscriptions.lock().push(tx);
        self.forms.lock().push(form.clone());
        self.count.send_modify(|count| *count += 1);
        UnboundedReceiverStream::new(rx).boxed()
    }

    /// Subscriptions started so far.
    pub fn subscription_count(&self) -> usize {
        *self.count.borrow()
    }

    /// Forms passed to each subscription, in order.
    pub fn subscribed_forms(&self) -> Vec<FormId> {
        self.forms.lock().clone()
    }

    /// Wait until at least `count` subscriptions were started.
    pub async fn wait_for_subscriptions(&self, count: usize) {
        wait_for_count(&self.count, count, "subscriptions").await;
    }

    /// Whether the consumer of subscription `index` is still listening.
    pub fn is_subscribed(&self, index: usize) -> bool {
        self.subscriptions
            .lock()
            .get(index)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Emit `item` on subscription `index`; false if it is gone.
    pub fn emit(&self, index: usize, item: T) -> bool {
        self.send(index, Ok(item))
    }

    /// Terminate subscription `index` with `error`; false if it is gone.
    pub fn fail(&self, index: usize, error: ProducerError) -> bool {
        self.send(index, Err(error))
    }

    /// Emit `item` on the most recent subscription.
    pub fn emit_latest(&self, item: T) -> bool {
        match self.subscription_count().checked_sub(1) {
            Some(index) => self.emit(index, item),
            None => false,
        }
    }

    fn send(&self, index: usize, item: Item<T>) -> bool {
        self.subscriptions
            .lock()
            .get(index)
            .is_some_and(|tx| tx.send(item).is_ok())
    }
}

impl<T: Clone + Send + 'static> Default for ScriptedProducer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionSource for ScriptedProducer<Vec<SectionViewModel>> {
    fn snapshots(&self, form: &FormId) -> SectionStream {
        self.subscribe(form)
    }
}

impl RuleEvaluator for ScriptedProducer<EvaluationResult> {
    fn evaluate(&self, form: &FormId) -> EvaluationStream {
        self.subscribe(form)
    }
}
