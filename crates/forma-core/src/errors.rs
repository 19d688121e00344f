//! Error taxonomy for the form pipeline.
//!
//! Most of these errors are fail-soft: they are handed to an
//! [`ErrorReporter`](crate::effects::ErrorReporter) and the session keeps
//! running. Only [`PipelineError`] is returned to callers.

use crate::identifiers::FormId;
use std::fmt;
use thiserror::Error;

/// The rule engine could not produce effects.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("rule evaluation failed: {message}")]
pub struct EvaluationFailure {
    /// Human-readable message
    pub message: String,
    /// Underlying cause, if the engine supplied one
    pub cause: Option<String>,
}

impl EvaluationFailure {
    /// Failure without a cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Attach a cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

/// A producer terminated abnormally.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("producer failed: {message}")]
pub struct ProducerError {
    /// Human-readable message
    pub message: String,
}

impl ProducerError {
    /// Create a producer error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<StorageError> for ProducerError {
    fn from(err: StorageError) -> Self {
        Self::new(err.to_string())
    }
}

/// Failures of the external storage collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Requested record does not exist
    #[error("record not found: {0}")]
    NotFound(String),
    /// Read failed
    #[error("storage read failed: {0}")]
    Read(String),
    /// Write failed
    #[error("storage write failed: {0}")]
    Write(String),
}

/// Names the stream a reported failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Section snapshots from metadata storage
    Sections,
    /// Rule evaluation results
    RuleEffects,
    /// Form title
    Title,
    /// Report date
    ReportDate,
    /// Incident date
    IncidentDate,
    /// Program settings driving the date pickers
    DateBounds,
    /// Report date edits coming from the view
    ReportDateInput,
    /// Incident date edits coming from the view
    IncidentDateInput,
    /// Coordinate edits coming from the view
    CoordinatesInput,
    /// Status changes coming from the view
    StatusChange,
}

impl StreamKind {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sections => "sections",
            Self::RuleEffects => "rule-effects",
            Self::Title => "title",
            Self::ReportDate => "report-date",
            Self::IncidentDate => "incident-date",
            Self::DateBounds => "date-bounds",
            Self::ReportDateInput => "report-date-input",
            Self::IncidentDateInput => "incident-date-input",
            Self::CoordinatesInput => "coordinates-input",
            Self::StatusChange => "status-change",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An error handed to the error reporter.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormError {
    /// Rule evaluation failed; sections were rendered unmodified
    #[error(transparent)]
    Evaluation(#[from] EvaluationFailure),

    /// A subscribed stream terminated abnormally
    #[error("{stream} stream failed: {error}")]
    Producer {
        /// Which stream failed
        stream: StreamKind,
        /// What went wrong
        #[source]
        error: ProducerError,
    },

    /// A write-through or one-shot storage call failed
    #[error("{operation} failed: {error}")]
    Storage {
        /// Storage operation name
        operation: &'static str,
        /// What went wrong
        #[source]
        error: StorageError,
    },
}

impl FormError {
    /// Producer failure on the given stream.
    pub fn producer(stream: StreamKind, error: impl Into<ProducerError>) -> Self {
        Self::Producer {
            stream,
            error: error.into(),
        }
    }

    /// Storage failure for the named operation.
    pub fn storage(operation: &'static str, error: StorageError) -> Self {
        Self::Storage { operation, error }
    }

    /// Stream the error came from, when it came from one.
    pub fn stream(&self) -> Option<StreamKind> {
        match self {
            Self::Evaluation(_) => Some(StreamKind::RuleEffects),
            Self::Producer { stream, .. } => Some(*stream),
            Self::Storage { .. } => None,
        }
    }
}

/// Lifecycle contract violations returned to callers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// `attach` was called twice without an intervening `detach`
    #[error("form {form} is already attached")]
    AlreadyAttached {
        /// Form whose pipeline was attached
        form: FormId,
    },

    /// No async runtime is available to host the pipeline
    #[error("no async runtime available")]
    NoRuntime,
}
