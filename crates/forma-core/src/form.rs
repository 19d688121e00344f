//! Form-level values loaded by the session alongside sections.

use crate::identifiers::FormId;
use serde::{Deserialize, Serialize};

/// What kind of record the form captures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    /// Enrollment of a tracked entity into a program
    Enrollment,
    /// A single event
    Event,
}

/// Identifies the record behind a form session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormArguments {
    /// Record uid
    pub uid: FormId,
    /// Record kind
    pub kind: FormKind,
}

impl FormArguments {
    /// Arguments for an event form.
    pub fn event(uid: impl Into<FormId>) -> Self {
        Self {
            uid: uid.into(),
            kind: FormKind::Event,
        }
    }

    /// Arguments for an enrollment form.
    pub fn enrollment(uid: impl Into<FormId>) -> Self {
        Self {
            uid: uid.into(),
            kind: FormKind::Enrollment,
        }
    }
}

/// Program settings that shape the date widgets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSettings {
    /// Whether the incident date is shown at all
    pub display_incident_date: bool,
    /// Enrollment date may be in the future
    pub enrollment_dates_in_future: bool,
    /// Incident date may be in the future
    pub incident_dates_in_future: bool,
}

/// Incident date together with the settings that decide its visibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDate {
    /// Program settings
    pub settings: ProgramSettings,
    /// Stored incident date in database format
    pub date: Option<String>,
}

/// Status a user can move a record to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Open for data entry
    Active,
    /// Finished
    Completed,
    /// Skipped without data
    Skipped,
}

/// Geographic point captured with the report.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

/// Result of completing an enrollment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationOutcome {
    /// Enrollment that was completed
    pub enrollment: FormId,
    /// Event of the first program stage to open next, when the program asks for it
    pub first_stage_event: Option<String>,
}
