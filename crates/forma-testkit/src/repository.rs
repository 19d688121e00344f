//! In-memory form repository.

use async_trait::async_trait;
use forma_core::{
    Coordinates, FormId, FormRepository, IncidentDate, ProgramSettings, RegistrationOutcome,
    StorageError, StorageStream,
};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::wait_for_count;

/// A value written through the repository.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    /// `store_report_date`
    ReportDate(String),
    /// `store_incident_date`
    IncidentDate(String),
    /// `store_coordinates`
    Coordinates(Coordinates),
}

#[derive(Debug, Default)]
struct RepositoryState {
    title: Option<String>,
    report_date: Option<String>,
    incident_date: Option<IncidentDate>,
    settings: Option<ProgramSettings>,
    first_stage_event: Option<String>,
    read_failure: Option<StorageError>,
    write_failure: Option<StorageError>,
    stored: Vec<StoredValue>,
    generated_events: Vec<FormId>,
}

/// Repository backed by plain fields.
///
/// Each configured value is emitted once per subscription and the stream
/// then stays open, like a live query that never changes.
#[derive(Debug)]
pub struct InMemoryFormRepository {
    state: Mutex<RepositoryState>,
    writes: watch::Sender<usize>,
}

impl InMemoryFormRepository {
    /// Repository with nothing stored.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RepositoryState::default()),
            writes: watch::channel(0).0,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(self, title: &str) -> Self {
        self.state.lock().title = Some(title.to_string());
        self
    }

    /// Set the stored report date (database format).
    #[must_use]
    pub fn with_report_date(self, date: &str) -> Self {
        self.state.lock().report_date = Some(date.to_string());
        self
    }

    /// Set the incident date and its settings.
    #[must_use]
    pub fn with_incident_date(self, incident: IncidentDate) -> Self {
        self.state.lock().incident_date = Some(incident);
        self
    }

    /// Set the program settings.
    #[must_use]
    pub fn with_settings(self, settings: ProgramSettings) -> Self {
        self.state.lock().settings = Some(settings);
        self
    }

    /// Event to open after enrollment completion.
    #[must_use]
    pub fn with_first_stage_event(self, event: &str) -> Self {
        self.state.lock().first_stage_event = Some(event.to_string());
        self
    }

    /// Make every read stream fail with `error`.
    #[must_use]
    pub fn failing_reads(self, error: StorageError) -> Self {
        self.state.lock().read_failure = Some(error);
        self
    }

    /// Make every write fail with `error`.
    #[must_use]
    pub fn failing_writes(self, error: StorageError) -> Self {
        self.state.lock().write_failure = Some(error);
        self
    }

    /// Values written so far.
    pub fn stored(&self) -> Vec<StoredValue> {
        self.state.lock().stored.clone()
    }

    /// Enrollments whose events were generated.
    pub fn generated_events(&self) -> Vec<FormId> {
        self.state.lock().generated_events.clone()
    }

    /// Wait for at least `count` successful writes.
    pub async fn wait_for_writes(&self, count: usize) -> Vec<StoredValue> {
        wait_for_count(&self.writes, count, "writes").await;
        self.stored()
    }

    fn read<T, F>(&self, select: F) -> StorageStream<T>
    where
        T: Send + 'static,
        F: FnOnce(&RepositoryState) -> Option<T>,
    {
        let state = self.state.lock();
        if let Some(err) = state.read_failure.clone() {
            return stream::iter([Err(err)]).boxed();
        }
        match select(&*state) {
            Some(value) => stream::iter([Ok(value)]).chain(stream::pending()).boxed(),
            None => stream::pending().boxed(),
        }
    }

    fn write(&self, value: StoredValue) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        if let Some(err) = state.write_failure.clone() {
            return Err(err);
        }
        state.stored.push(value);
        let len = state.stored.len();
        drop(state);
        self.writes.send_replace(len);
        Ok(())
    }
}

impl Default for InMemoryFormRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormRepository for InMemoryFormRepository {
    fn title(&self) -> StorageStream<String> {
        self.read(|state| state.title.clone())
    }

    fn report_date(&self) -> StorageStream<String> {
        self.read(|state| state.report_date.clone())
    }

    fn incident_date(&self) -> StorageStream<IncidentDate> {
        self.read(|state| state.incident_date.clone())
    }

    fn program_settings(&self) -> StorageStream<ProgramSettings> {
        self.read(|state| state.settings.clone())
    }

    async fn store_report_date(&self, date: String) -> Result<(), StorageError> {
        self.write(StoredValue::ReportDate(date))
    }

    async fn store_incident_date(&self, date: String) -> Result<(), StorageError> {
        self.write(StoredValue::IncidentDate(date))
    }

    async fn store_coordinates(&self, coordinates: Coordinates) -> Result<(), StorageError> {
        self.write(StoredValue::Coordinates(coordinates))
    }

    async fn auto_generate_events(&self, enrollment: &FormId) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        if let Some(err) = state.write_failure.clone() {
            return Err(err);
        }
        state.generated_events.push(enrollment.clone());
        Ok(())
    }

    async fn use_first_stage_during_registration(
        &self,
    ) -> Result<RegistrationOutcome, StorageError> {
        let state = self.state.lock();
        let enrollment = state
            .generated_events
            .last()
            .cloned()
            .ok_or_else(|| StorageError::NotFound("enrollment".to_string()))?;
        Ok(RegistrationOutcome {
            enrollment,
            first_stage_event: state.first_stage_event.clone(),
        })
    }
}
