use crate::errors::StorageError;
use crate::form::{Coordinates, IncidentDate, ProgramSettings, RegistrationOutcome};
use crate::identifiers::FormId;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of values read from storage.
pub type StorageStream<T> = BoxStream<'static, Result<T, StorageError>>;

/// Key/value access to the record behind a form.
///
/// Read methods return live streams; write methods are one-shot.
#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Form title.
    fn title(&self) -> StorageStream<String>;

    /// Report date in database format.
    fn report_date(&self) -> StorageStream<String>;

    /// Incident date with the settings that decide whether it is shown.
    fn incident_date(&self) -> StorageStream<IncidentDate>;

    /// Program settings for the date pickers.
    fn program_settings(&self) -> StorageStream<ProgramSettings>;

    /// Persist the report date.
    async fn store_report_date(&self, date: String) -> Result<(), StorageError>;

    /// Persist the incident date.
    async fn store_incident_date(&self, date: String) -> Result<(), StorageError>;

    /// Persist the captured coordinates.
    async fn store_coordinates(&self, coordinates: Coordinates) -> Result<(), StorageError>;

    /// Generate the events a completed enrollment schedules automatically.
    async fn auto_generate_events(&self, enrollment: &FormId) -> Result<(), StorageError>;

    /// Decide whether registration continues into the first program stage.
    async fn use_first_stage_during_registration(
        &self,
    ) -> Result<RegistrationOutcome, StorageError>;
}
