//! Collaborator contracts consumed by the pipeline.
//!
//! The runtime layer never reaches into storage, the rule engine or the UI
//! directly; it only talks to these traits.

mod presentation;
mod producers;
mod repository;

pub use presentation::{ErrorReporter, FormView, SectionSink};
pub use producers::{EvaluationStream, RuleEvaluator, SectionSource, SectionStream};
pub use repository::{FormRepository, StorageStream};
