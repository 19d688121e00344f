//! Recording sinks, reporters and views.

use forma_core::{
    Coordinates, ErrorReporter, FormError, FormView, IncidentDate, RegistrationOutcome,
    ReportStatus, SectionSink, SectionViewModel,
};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::wait_for_count;

/// Records every render call.
#[derive(Debug)]
pub struct RecordingSink {
    renders: Mutex<Vec<Vec<SectionViewModel>>>,
    count: watch::Sender<usize>,
}

impl RecordingSink {
    /// Empty recorder.
    pub fn new() -> Self {
        Self {
            renders: Mutex::new(Vec::new()),
            count: watch::channel(0).0,
        }
    }

    /// Every render so far, in order.
    pub fn renders(&self) -> Vec<Vec<SectionViewModel>> {
        self.renders.lock().clone()
    }

    /// Number of renders so far.
    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    /// Most recent render.
    pub fn last(&self) -> Option<Vec<SectionViewModel>> {
        self.renders.lock().last().cloned()
    }

    /// Wait for at least `count` renders and return all of them.
    pub async fn wait_for_renders(&self, count: usize) -> Vec<Vec<SectionViewModel>> {
        wait_for_count(&self.count, count, "renders").await;
        self.renders()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionSink for RecordingSink {
    fn render(&self, sections: Vec<SectionViewModel>) {
        let mut renders = self.renders.lock();
        renders.push(sections);
        let len = renders.len();
        drop(renders);
        self.count.send_replace(len);
    }
}

/// Records every reported error.
#[derive(Debug)]
pub struct RecordingErrorReporter {
    errors: Mutex<Vec<FormError>>,
    count: watch::Sender<usize>,
}

impl RecordingErrorReporter {
    /// Empty recorder.
    pub fn new() -> Self {
        Self {
            errors: Mutex::new(Vec::new()),
            count: watch::channel(0).0,
        }
    }

    /// Every error so far, in order.
    pub fn errors(&self) -> Vec<FormError> {
        self.errors.lock().clone()
    }

    /// Wait for at least `count` errors and return all of them.
    pub async fn wait_for_errors(&self, count: usize) -> Vec<FormError> {
        wait_for_count(&self.count, count, "errors").await;
        self.errors()
    }
}

impl Default for RecordingErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorReporter for RecordingErrorReporter {
    fn report(&self, error: &FormError) {
        let mut errors = self.errors.lock();
        errors.push(error.clone());
        let len = errors.len();
        drop(errors);
        self.count.send_replace(len);
    }
}

/// One call made on a [`RecordingFormView`].
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    /// `render_sections`
    Sections(Vec<SectionViewModel>),
    /// `render_title`
    Title(String),
    /// `render_report_date`
    ReportDate(String),
    /// `render_incident_date`
    IncidentDate(IncidentDate),
    /// `init_report_date_picker`
    DatePicker {
        /// Enrollment dates may be in the future
        enrollment_in_future: bool,
        /// Incident dates may be in the future
        incident_in_future: bool,
    },
    /// `render_status`
    Status(ReportStatus),
    /// `finish_enrollment`
    EnrollmentFinished(RegistrationOutcome),
}

#[derive(Debug, Default)]
struct ViewInputs {
    report_date: Option<mpsc::UnboundedSender<String>>,
    incident_date: Option<mpsc::UnboundedSender<Option<String>>>,
    coordinates: Option<mpsc::UnboundedSender<Option<Coordinates>>>,
    status: Option<mpsc::UnboundedSender<ReportStatus>>,
}

fn input_stream<T: Send + 'static>(
    slot: &mut Option<mpsc::UnboundedSender<T>>,
) -> BoxStream<'static, T> {
    let (tx, rx) = mpsc::unbounded_channel();
    *slot = Some(tx);
    UnboundedReceiverStream::new(rx).boxed()
}

fn send_input<T>(slot: &Option<mpsc::UnboundedSender<T>>, value: T) -> bool {
    slot.as_ref().is_some_and(|tx| tx.send(value).is_ok())
}

/// A form view that records render calls and lets tests drive user input.
///
/// Input streams are recreated each time the session subscribes, so a view
/// can be re-attached.
#[derive(Debug)]
pub struct RecordingFormView {
    events: Mutex<Vec<ViewEvent>>,
    count: watch::Sender<usize>,
    inputs: Mutex<ViewInputs>,
}

impl RecordingFormView {
    /// Empty view.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            count: watch::channel(0).0,
            inputs: Mutex::new(ViewInputs::default()),
        }
    }

    fn record(&self, event: ViewEvent) {
        let mut events = self.events.lock();
        events.push(event);
        let len = events.len();
        drop(events);
        self.count.send_replace(len);
    }

    /// Every call so far, in order.
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().clone()
    }

    /// Section lists rendered so far.
    pub fn section_renders(&self) -> Vec<Vec<SectionViewModel>> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Sections(sections) => Some(sections.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait until an event matching `predicate` was recorded and return it.
    pub async fn wait_for_event<F>(&self, predicate: F) -> ViewEvent
    where
        F: Fn(&ViewEvent) -> bool,
    {
        loop {
            let seen = {
                let events = self.events.lock();
                if let Some(event) = events.iter().find(|e| predicate(e)) {
                    return event.clone();
                }
                events.len()
            };
            wait_for_count(&self.count, seen + 1, "view events").await;
        }
    }

    /// Simulate the user picking a report date.
    pub fn pick_report_date(&self, date: &str) -> bool {
        send_input(&self.inputs.lock().report_date, date.to_string())
    }

    /// Simulate the user picking or clearing the incident date.
    pub fn pick_incident_date(&self, date: Option<&str>) -> bool {
        send_input(&self.inputs.lock().incident_date, date.map(str::to_string))
    }

    /// Simulate a coordinate capture.
    pub fn capture_coordinates(&self, coordinates: Option<Coordinates>) -> bool {
        send_input(&self.inputs.lock().coordinates, coordinates)
    }

    /// Simulate a status change.
    pub fn change_status(&self, status: ReportStatus) -> bool {
        send_input(&self.inputs.lock().status, status)
    }
}

impl Default for RecordingFormView {
    fn default() -> Self {
        Self::new()
    }
}

impl FormView for RecordingFormView {
    fn render_sections(&self, sections: Vec<SectionViewModel>) {
        self.record(ViewEvent::Sections(sections));
    }

    fn render_title(&self, title: String) {
        self.record(ViewEvent::Title(title));
    }

    fn render_report_date(&self, date: String) {
        self.record(ViewEvent::ReportDate(date));
    }

    fn render_incident_date(&self, incident: IncidentDate) {
        self.record(ViewEvent::IncidentDate(incident));
    }

    fn init_report_date_picker(&self, enrollment_in_future: bool, incident_in_future: bool) {
        self.record(ViewEvent::DatePicker {
            enrollment_in_future,
            incident_in_future,
        });
    }

    fn render_status(&self, status: ReportStatus) {
        self.record(ViewEvent::Status(status));
    }

    fn finish_enrollment(&self, outcome: RegistrationOutcome) {
        self.record(ViewEvent::EnrollmentFinished(outcome));
    }

    fn report_date_changed(&self) -> BoxStream<'static, String> {
        input_stream(&mut self.inputs.lock().report_date)
    }

    fn incident_date_changed(&self) -> BoxStream<'static, Option<String>> {
        input_stream(&mut self.inputs.lock().incident_date)
    }

    fn coordinates_changed(&self) -> BoxStream<'static, Option<Coordinates>> {
        input_stream(&mut self.inputs.lock().coordinates)
    }

    fn status_changed(&self) -> BoxStream<'static, ReportStatus> {
        input_stream(&mut self.inputs.lock().status)
    }
}
