//! # Form Pipeline
//!
//! Merges the section stream and the rule-evaluation stream into one ordered
//! list of visible sections, delivered to a [`SectionSink`].
//!
//! ```text
//! RecheckTrigger ──► merge driver ──► (SectionSource ⨝ RuleEvaluator) ──► EffectApplier ──► sink
//! ```
//!
//! Every recheck signal disposes the previous merge and starts a new one, so
//! at most one merge is live per attach. Producer failures stop the current
//! merge and are reported; a new recheck is needed to recover.

use std::sync::Arc;

use forma_core::{
    EffectApplier, ErrorReporter, EvaluationResult, FormError, FormId, PipelineError, ProducerError,
    RuleEvaluator, SectionSink, SectionSource, SectionViewModel, StreamKind,
};
use futures::{StreamExt, TryStreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::Instrument;

use crate::pairing::PairedStream;
use crate::presentation::PresentationQueue;
use crate::recheck::{RecheckSignal, RecheckSignals, RecheckTrigger, CHECK_SECTIONS_REASON};
use crate::scheduler::Schedulers;
use crate::subscriptions::{LivenessToken, SubscriptionRegistry};

/// Lifecycle state of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStatus {
    /// No sink, no subscriptions
    Detached,
    /// Delivering to a sink
    Attached,
}

struct Attachment {
    registry: Arc<SubscriptionRegistry>,
    trigger: RecheckTrigger,
}

enum PipelineState {
    Detached,
    Attached(Attachment),
}

/// Everything one merge needs, shared by all merges of an attach.
#[derive(Clone)]
struct MergeContext {
    form: FormId,
    sections: Arc<dyn SectionSource>,
    rules: Arc<dyn RuleEvaluator>,
    applier: EffectApplier,
    reporter: Arc<dyn ErrorReporter>,
    schedulers: Schedulers,
    presentation: PresentationQueue,
    sink: Arc<dyn SectionSink>,
}

/// Owns the section merge for one form.
pub struct FormPipeline {
    form: FormId,
    sections: Arc<dyn SectionSource>,
    rules: Arc<dyn RuleEvaluator>,
    reporter: Arc<dyn ErrorReporter>,
    schedulers: Schedulers,
    state: Mutex<PipelineState>,
}

impl FormPipeline {
    /// Create a detached pipeline.
    pub fn new(
        form: FormId,
        sections: Arc<dyn SectionSource>,
        rules: Arc<dyn RuleEvaluator>,
        reporter: Arc<dyn ErrorReporter>,
        schedulers: Schedulers,
    ) -> Self {
        Self {
            form,
            sections,
            rules,
            reporter,
            schedulers,
            state: Mutex::new(PipelineState::Detached),
        }
    }

    /// Form this pipeline renders.
    pub fn form(&self) -> &FormId {
        &self.form
    }

    /// Current lifecycle state.
    pub fn status(&self) -> PipelineStatus {
        match *self.state.lock() {
            PipelineState::Detached => PipelineStatus::Detached,
            PipelineState::Attached(_) => PipelineStatus::Attached,
        }
    }

    /// Start merging and delivering to `sink`.
    ///
    /// The merge runs once immediately via the implicit `init` signal.
    /// Deliveries go through a presentation queue owned by this attach.
    pub fn attach(&self, sink: Arc<dyn SectionSink>) -> Result<(), PipelineError> {
        self.attach_inner(sink, None)
    }

    /// Like [`FormPipeline::attach`], but deliver through `presentation`.
    ///
    /// Callers that render other view state through the same queue get one
    /// serialized presentation context for everything.
    pub fn attach_with(
        &self,
        sink: Arc<dyn SectionSink>,
        presentation: PresentationQueue,
    ) -> Result<(), PipelineError> {
        self.attach_inner(sink, Some(presentation))
    }

    fn attach_inner(
        &self,
        sink: Arc<dyn SectionSink>,
        presentation: Option<PresentationQueue>,
    ) -> Result<(), PipelineError> {
        let mut state = self.state.lock();
        if matches!(*state, PipelineState::Attached(_)) {
            return Err(PipelineError::AlreadyAttached {
                form: self.form.clone(),
            });
        }

        let registry = Arc::new(SubscriptionRegistry::new());
        let presentation = presentation.unwrap_or_else(|| {
            PresentationQueue::start(&self.schedulers.presentation, &registry)
        });
        let (trigger, signals) = RecheckTrigger::channel();
        let ctx = MergeContext {
            form: self.form.clone(),
            sections: self.sections.clone(),
            rules: self.rules.clone(),
            applier: EffectApplier::new(self.reporter.clone()),
            reporter: self.reporter.clone(),
            schedulers: self.schedulers.clone(),
            presentation,
            sink,
        };

        let span = tracing::debug_span!("form_pipeline", form = %self.form);
        registry.spawn(
            &self.schedulers.io,
            drive_merges(signals, registry.clone(), ctx).instrument(span),
        );

        tracing::debug!(form = %self.form, "pipeline attached");
        *state = PipelineState::Attached(Attachment { registry, trigger });
        Ok(())
    }

    /// Dispose every subscription and stop all deliveries.
    ///
    /// Every queued delivery is revoked before this returns. When called on
    /// the presentation context no sink call starts afterwards; from another
    /// context a sink call already running is allowed to finish. Idempotent.
    pub fn detach(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), PipelineState::Detached);
        if let PipelineState::Attached(attachment) = previous {
            attachment.registry.dispose();
            tracing::debug!(form = %self.form, "pipeline detached");
        }
    }

    /// Restart the merge with a fresh producer pair.
    ///
    /// Returns false when the pipeline is detached.
    pub fn request_recheck(&self, reason: impl Into<String>) -> bool {
        match &*self.state.lock() {
            PipelineState::Attached(attachment) => attachment.trigger.request_recheck(reason),
            PipelineState::Detached => {
                tracing::debug!(form = %self.form, "recheck ignored, pipeline detached");
                false
            }
        }
    }

    /// Re-evaluate which sections are visible.
    pub fn check_sections(&self) -> bool {
        self.request_recheck(CHECK_SECTIONS_REASON)
    }

    /// A trigger usable from any context while this attach lasts.
    pub fn trigger(&self) -> Option<RecheckTrigger> {
        match &*self.state.lock() {
            PipelineState::Attached(attachment) => Some(attachment.trigger.clone()),
            PipelineState::Detached => None,
        }
    }
}

impl Drop for FormPipeline {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for FormPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormPipeline")
            .field("form", &self.form)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Restart the merge on every recheck signal.
///
/// The previous merge is disposed before the next one subscribes, so two
/// merges never race to deliver.
async fn drive_merges(
    mut signals: RecheckSignals,
    registry: Arc<SubscriptionRegistry>,
    ctx: MergeContext,
) {
    let mut active: Option<Arc<SubscriptionRegistry>> = None;
    let mut generation: u64 = 0;

    while let Some(signal) = signals.recv().await {
        if let Some(previous) = active.take() {
            previous.dispose();
        }
        generation += 1;
        tracing::debug!(reason = %signal.reason, generation, "starting section merge");
        let scope = registry.child();
        start_merge(&ctx, &scope, &signal, generation);
        active = Some(scope);
    }
}

/// Subscribe to both producers and run one merge under `scope`.
fn start_merge(
    ctx: &MergeContext,
    scope: &Arc<SubscriptionRegistry>,
    signal: &RecheckSignal,
    generation: u64,
) {
    let sections = ctx
        .sections
        .snapshots(&ctx.form)
        .map_err(|err| (StreamKind::Sections, err))
        .boxed();

    // Rules are pumped on the computation context into the right-hand buffer.
    let (rules_tx, rules_rx) =
        mpsc::unbounded_channel::<Result<EvaluationResult, ProducerError>>();
    let mut evaluations = ctx.rules.evaluate(&ctx.form);
    scope.spawn(&ctx.schedulers.computation, async move {
        while let Some(item) = evaluations.next().await {
            let failed = item.is_err();
            if rules_tx.send(item).is_err() || failed {
                break;
            }
        }
    });
    let rules = UnboundedReceiverStream::new(rules_rx)
        .map_err(|err| (StreamKind::RuleEffects, err))
        .boxed();

    let io = ctx.schedulers.io.clone();
    let ctx = ctx.clone();
    let token = scope.token();
    let span = tracing::debug_span!("section_merge", reason = %signal.reason, generation);
    scope.spawn(
        &io,
        async move {
            let mut paired = PairedStream::new(sections, rules);
            while let Some(pair) = paired.next().await {
                if !token.is_live() {
                    return;
                }
                match pair {
                    Ok((snapshot, result)) => {
                        let merged = ctx.applier.apply(snapshot, &result);
                        deliver(&ctx, &token, merged);
                    }
                    Err((stream, error)) => {
                        tracing::warn!(%stream, %error, "producer failed, merge stopped until next recheck");
                        ctx.reporter.report(&FormError::producer(stream, error));
                        return;
                    }
                }
            }
            tracing::debug!("producers completed");
        }
        .instrument(span),
    );
}

fn deliver(ctx: &MergeContext, token: &LivenessToken, sections: Vec<SectionViewModel>) {
    let sink = ctx.sink.clone();
    let count = sections.len();
    if !ctx.presentation.deliver(token, move || sink.render(sections)) {
        tracing::trace!("presentation queue closed");
        return;
    }
    tracing::trace!(sections = count, "merged sections queued");
}
