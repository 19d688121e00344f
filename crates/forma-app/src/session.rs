//! # Form Session
//!
//! Everything a form screen subscribes to while it is shown: the section
//! pipeline plus the simple load-and-render and write-through streams.
//!
//! Load streams are read on the I/O context and rendered through the
//! presentation queue the section pipeline also delivers through. View inputs are written through to storage on the
//! I/O context. A failing stream is reported and stops on its own; the rest
//! of the session keeps running.

use std::future::Future;
use std::sync::Arc;

use forma_core::{
    ErrorReporter, FormArguments, FormError, FormId, FormKind, FormRepository, FormView,
    PipelineError, RegistrationOutcome, RuleEvaluator, SectionSink, SectionSource,
    SectionViewModel, StorageError, StorageStream, StreamKind,
};
use futures::stream::BoxStream;
use futures::{future, StreamExt, TryStreamExt};
use parking_lot::Mutex;

use crate::config::FormConfig;
use crate::pipeline::{FormPipeline, PipelineStatus};
use crate::presentation::PresentationQueue;
use crate::scheduler::Schedulers;
use crate::subscriptions::SubscriptionRegistry;

/// External collaborators of a session.
#[derive(Clone)]
pub struct FormCollaborators {
    /// Record storage
    pub repository: Arc<dyn FormRepository>,
    /// Section snapshots
    pub sections: Arc<dyn SectionSource>,
    /// Rule evaluation results
    pub rules: Arc<dyn RuleEvaluator>,
    /// Sink for non-fatal failures
    pub reporter: Arc<dyn ErrorReporter>,
}

struct ViewSink(Arc<dyn FormView>);

impl SectionSink for ViewSink {
    fn render(&self, sections: Vec<SectionViewModel>) {
        self.0.render_sections(sections);
    }
}

/// Per-attach wiring shared by every subscription of the session.
#[derive(Clone)]
struct Wiring {
    registry: Arc<SubscriptionRegistry>,
    presentation: PresentationQueue,
    view: Arc<dyn FormView>,
    repository: Arc<dyn FormRepository>,
    reporter: Arc<dyn ErrorReporter>,
    schedulers: Schedulers,
}

impl Wiring {
    /// Render every value of `stream` on the presentation context.
    fn render_each<T, F>(&self, kind: StreamKind, stream: StorageStream<T>, render: F)
    where
        T: Send + 'static,
        F: Fn(&dyn FormView, T) + Send + Sync + 'static,
    {
        let render = Arc::new(render);
        let token = self.registry.token();
        let wiring = self.clone();
        self.registry.spawn(&self.schedulers.io, async move {
            let mut stream = stream;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(value) => {
                        let view = wiring.view.clone();
                        let render = render.clone();
                        wiring
                            .presentation
                            .deliver(&token, move || (*render)(view.as_ref(), value));
                    }
                    Err(err) => {
                        tracing::warn!(stream = %kind, error = %err, "load stream failed");
                        if token.is_live() {
                            wiring.reporter.report(&FormError::producer(kind, err));
                        }
                        return;
                    }
                }
            }
        });
    }

    /// Persist every present value of `inputs`.
    fn write_each<T, F, Fut>(
        &self,
        kind: StreamKind,
        operation: &'static str,
        inputs: BoxStream<'static, Option<T>>,
        write: F,
    ) where
        T: Send + 'static,
        F: Fn(Arc<dyn FormRepository>, T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        let token = self.registry.token();
        let repository = self.repository.clone();
        let reporter = self.reporter.clone();
        self.registry.spawn(&self.schedulers.io, async move {
            let mut inputs = inputs.filter_map(future::ready);
            while let Some(value) = inputs.next().await {
                if let Err(err) = write(repository.clone(), value).await {
                    tracing::warn!(stream = %kind, operation, error = %err, "write-through failed");
                    if token.is_live() {
                        reporter.report(&FormError::storage(operation, err));
                    }
                    return;
                }
            }
        });
    }
}

/// A form screen's subscriptions, attached and detached together.
pub struct FormSession {
    args: FormArguments,
    collaborators: FormCollaborators,
    schedulers: Schedulers,
    config: FormConfig,
    pipeline: FormPipeline,
    attached: Mutex<Option<Arc<SubscriptionRegistry>>>,
}

impl FormSession {
    /// Create a detached session.
    pub fn new(
        args: FormArguments,
        collaborators: FormCollaborators,
        schedulers: Schedulers,
        config: FormConfig,
    ) -> Self {
        let pipeline = FormPipeline::new(
            args.uid.clone(),
            collaborators.sections.clone(),
            collaborators.rules.clone(),
            collaborators.reporter.clone(),
            schedulers.clone(),
        );
        Self {
            args,
            collaborators,
            schedulers,
            config,
            pipeline,
            attached: Mutex::new(None),
        }
    }

    /// Record behind this session.
    pub fn arguments(&self) -> &FormArguments {
        &self.args
    }

    /// Lifecycle state of the section pipeline.
    pub fn status(&self) -> PipelineStatus {
        self.pipeline.status()
    }

    /// Subscribe everything and start rendering into `view`.
    pub fn attach(&self, view: Arc<dyn FormView>) -> Result<(), PipelineError> {
        let mut attached = self.attached.lock();
        if attached.is_some() {
            return Err(PipelineError::AlreadyAttached {
                form: self.args.uid.clone(),
            });
        }

        let registry = Arc::new(SubscriptionRegistry::new());
        let presentation = PresentationQueue::start(&self.schedulers.presentation, &registry);
        self.pipeline
            .attach_with(Arc::new(ViewSink(view.clone())), presentation.clone())?;

        let wiring = Wiring {
            presentation,
            registry: registry.clone(),
            view,
            repository: self.collaborators.repository.clone(),
            reporter: self.collaborators.reporter.clone(),
            schedulers: self.schedulers.clone(),
        };

        self.subscribe_loads(&wiring);
        self.subscribe_inputs(&wiring);
        self.subscribe_status_changes(&wiring);

        tracing::debug!(form = %self.args.uid, kind = ?self.args.kind, "form session attached");
        *attached = Some(registry);
        Ok(())
    }

    /// Dispose every subscription. Idempotent.
    ///
    /// Same delivery guarantee as [`FormPipeline::detach`].
    pub fn detach(&self) {
        self.pipeline.detach();
        if let Some(registry) = self.attached.lock().take() {
            registry.dispose();
            tracing::debug!(form = %self.args.uid, "form session detached");
        }
    }

    /// Re-evaluate which sections are visible.
    pub fn check_sections(&self) -> bool {
        self.pipeline.check_sections()
    }

    fn subscribe_loads(&self, wiring: &Wiring) {
        let repository = &self.collaborators.repository;

        wiring.render_each(StreamKind::Title, repository.title(), |view, title| {
            view.render_title(title);
        });

        let formats = self.config.dates.clone();
        let report_dates = repository
            .report_date()
            .map_ok(move |raw| match formats.to_ui(&raw) {
                Ok(shown) => shown,
                Err(err) => {
                    tracing::warn!(error = %err, "unable to parse report date, rendering raw value");
                    raw
                }
            })
            .boxed();
        wiring.render_each(StreamKind::ReportDate, report_dates, |view, date| {
            view.render_report_date(date);
        });

        let incident_dates = repository
            .incident_date()
            .try_filter(|incident| future::ready(incident.settings.display_incident_date))
            .boxed();
        wiring.render_each(StreamKind::IncidentDate, incident_dates, |view, incident| {
            view.render_incident_date(incident);
        });

        wiring.render_each(
            StreamKind::DateBounds,
            repository.program_settings(),
            |view, settings| {
                view.init_report_date_picker(
                    settings.enrollment_dates_in_future,
                    settings.incident_dates_in_future,
                );
            },
        );
    }

    fn subscribe_inputs(&self, wiring: &Wiring) {
        wiring.write_each(
            StreamKind::ReportDateInput,
            "store report date",
            wiring.view.report_date_changed().map(Some).boxed(),
            |repository, date| async move { repository.store_report_date(date).await },
        );
        wiring.write_each(
            StreamKind::IncidentDateInput,
            "store incident date",
            wiring.view.incident_date_changed(),
            |repository, date| async move { repository.store_incident_date(date).await },
        );
        wiring.write_each(
            StreamKind::CoordinatesInput,
            "store coordinates",
            wiring.view.coordinates_changed(),
            |repository, coordinates| async move {
                repository.store_coordinates(coordinates).await
            },
        );
    }

    fn subscribe_status_changes(&self, wiring: &Wiring) {
        let kind = self.args.kind;
        let uid = self.args.uid.clone();
        let token = wiring.registry.token();
        let wiring_task = wiring.clone();
        let mut statuses = wiring.view.status_changed();

        wiring.registry.spawn(&wiring.schedulers.io, async move {
            let wiring = wiring_task;
            while let Some(status) = statuses.next().await {
                match kind {
                    FormKind::Event => {
                        let view = wiring.view.clone();
                        wiring
                            .presentation
                            .deliver(&token, move || view.render_status(status));
                    }
                    FormKind::Enrollment => {
                        tracing::debug!(enrollment = %uid, ?status, "completing enrollment");
                        match complete_enrollment(wiring.repository.as_ref(), &uid).await {
                            Ok(outcome) => {
                                let view = wiring.view.clone();
                                wiring
                                    .presentation
                                    .deliver(&token, move || view.finish_enrollment(outcome));
                            }
                            Err(err) => {
                                tracing::warn!(enrollment = %uid, error = %err, "enrollment completion failed");
                                if token.is_live() {
                                    wiring
                                        .reporter
                                        .report(&FormError::storage("complete enrollment", err));
                                }
                                return;
                            }
                        }
                    }
                }
            }
        });
    }
}

async fn complete_enrollment(
    repository: &dyn FormRepository,
    enrollment: &FormId,
) -> Result<RegistrationOutcome, StorageError> {
    repository.auto_generate_events(enrollment).await?;
    repository.use_first_stage_during_registration().await
}

impl Drop for FormSession {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("args", &self.args)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
