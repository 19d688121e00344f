use crate::errors::ProducerError;
use crate::identifiers::FormId;
use crate::rules::EvaluationResult;
use crate::sections::SectionViewModel;
use futures::stream::BoxStream;

/// Lazy, restartable sequence of section snapshots.
pub type SectionStream = BoxStream<'static, Result<Vec<SectionViewModel>, ProducerError>>;

/// Lazy, restartable sequence of rule evaluation results.
pub type EvaluationStream = BoxStream<'static, Result<EvaluationResult, ProducerError>>;

/// Produces section snapshots from metadata storage.
///
/// Every call starts a fresh subscription. The stream is expected to be
/// infinite and to emit whenever the underlying metadata changes; an `Err`
/// item terminates it.
pub trait SectionSource: Send + Sync {
    /// Subscribe to section snapshots for `form`.
    fn snapshots(&self, form: &FormId) -> SectionStream;
}

/// Produces rule evaluation results.
///
/// Same subscription contract as [`SectionSource`]. An evaluation failure is
/// an `Ok(EvaluationResult::Failure(..))` item and does not end the stream.
pub trait RuleEvaluator: Send + Sync {
    /// Subscribe to evaluation results for `form`.
    fn evaluate(&self, form: &FormId) -> EvaluationStream;
}
