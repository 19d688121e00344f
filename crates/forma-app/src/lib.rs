//! # Forma App - Runtime Orchestration
//!
//! Runs the form-rendering pipeline on injected Tokio execution contexts.
//!
//! ## Key Components
//!
//! - **FormPipeline**: merges section snapshots with rule evaluation results
//!   and delivers the visible sections to a sink, restarting on every recheck
//! - **FormSession**: the pipeline plus the title, date, write-through and
//!   status-change streams of a form screen
//! - **SubscriptionRegistry**: arena of live subscriptions released together
//! - **PairedStream**: positional pairing of two independently timed producers
//! - **RecheckTrigger**: signal channel that restarts the merge
//!
//! ## Usage
//!
//! ```rust,ignore
//! use forma_app::{FormPipeline, Schedulers, TracingErrorReporter};
//!
//! let pipeline = FormPipeline::new(
//!     form_id,
//!     sections,
//!     rules,
//!     Arc::new(TracingErrorReporter),
//!     Schedulers::try_current()?,
//! );
//! pipeline.attach(sink)?;
//! pipeline.check_sections();
//! pipeline.detach();
//! ```

pub mod config;
pub mod logging;
pub mod pairing;
pub mod pipeline;
pub mod presentation;
pub mod recheck;
pub mod reporting;
pub mod scheduler;
pub mod session;
pub mod subscriptions;

pub use config::{ConfigError, FormConfig, LoggingConfig};
pub use logging::init_tracing;
pub use pairing::PairedStream;
pub use pipeline::{FormPipeline, PipelineStatus};
pub use presentation::PresentationQueue;
pub use recheck::{
    RecheckSignal, RecheckSignals, RecheckTrigger, CHECK_SECTIONS_REASON, INITIAL_RECHECK_REASON,
};
pub use reporting::TracingErrorReporter;
pub use scheduler::{Scheduler, Schedulers};
pub use session::{FormCollaborators, FormSession};
pub use subscriptions::{LivenessToken, SubscriptionRegistry};
