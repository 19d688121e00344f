//! # Forma Core - Domain Layer
//!
//! Domain types and pure logic for the form-rendering pipeline.
//!
//! ## Purpose
//!
//! - Section and field view-models rendered by the presentation layer
//! - The closed rule-effect taxonomy produced by rule evaluation
//! - The effect applier that merges one section snapshot with one
//!   evaluation result
//! - Collaborator contracts (producers, sinks, storage) consumed by the
//!   runtime layer in `forma-app`
//!
//! ## What Does NOT Belong Here
//!
//! - Task spawning, scheduling and subscription lifecycle (belong in forma-app)
//! - Scripted collaborators for tests (belong in forma-testkit)

pub mod apply;
pub mod dates;
pub mod effects;
pub mod errors;
pub mod form;
pub mod identifiers;
pub mod rules;
pub mod sections;

pub use apply::{merge_effects, EffectApplier};
pub use dates::{convert_date, DateFormatError, DateFormats};
pub use effects::{
    ErrorReporter, EvaluationStream, FormRepository, FormView, RuleEvaluator, SectionSink,
    SectionSource, SectionStream, StorageStream,
};
pub use errors::{
    EvaluationFailure, FormError, PipelineError, ProducerError, StorageError, StreamKind,
};
pub use form::{
    Coordinates, FormArguments, FormKind, IncidentDate, ProgramSettings, RegistrationOutcome,
    ReportStatus,
};
pub use identifiers::{FieldUid, FormId, SectionUid};
pub use rules::{EvaluationResult, RuleEffect};
pub use sections::{FieldViewModel, SectionViewModel};
