use crate::errors::FormError;
use crate::form::{Coordinates, IncidentDate, RegistrationOutcome, ReportStatus};
use crate::sections::SectionViewModel;
use futures::stream::BoxStream;

/// Receives merged section lists on the presentation context.
///
/// Must tolerate repeated calls with supersets or subsets of earlier content.
pub trait SectionSink: Send + Sync {
    /// Render the currently visible sections, in order.
    fn render(&self, sections: Vec<SectionViewModel>);
}

/// Fire-and-forget sink for non-fatal failures.
pub trait ErrorReporter: Send + Sync {
    /// Report one failure.
    fn report(&self, error: &FormError);
}

/// The full form screen.
///
/// Render methods are invoked on the presentation context only. Input
/// methods are called once per attach and return the stream of user edits.
pub trait FormView: Send + Sync {
    /// Render the visible sections.
    fn render_sections(&self, sections: Vec<SectionViewModel>);

    /// Render the form title.
    fn render_title(&self, title: String);

    /// Render the report date, already in UI format.
    fn render_report_date(&self, date: String);

    /// Render the incident date.
    fn render_incident_date(&self, incident: IncidentDate);

    /// Configure the date pickers.
    fn init_report_date_picker(&self, enrollment_in_future: bool, incident_in_future: bool);

    /// Reflect a status change on an event form.
    fn render_status(&self, status: ReportStatus);

    /// Close an enrollment form after completion.
    fn finish_enrollment(&self, outcome: RegistrationOutcome);

    /// Report dates picked by the user.
    fn report_date_changed(&self) -> BoxStream<'static, String>;

    /// Incident dates picked by the user; `None` when cleared.
    fn incident_date_changed(&self) -> BoxStream<'static, Option<String>>;

    /// Coordinates captured by the user; `None` when unavailable.
    fn coordinates_changed(&self) -> BoxStream<'static, Option<Coordinates>>;

    /// Status changes requested by the user.
    fn status_changed(&self) -> BoxStream<'static, ReportStatus>;
}
