//! # Forma Testkit
//!
//! Scripted collaborators for exercising the pipeline without storage, a
//! rule engine or a UI.
//!
//! Every recorder exposes `wait_for_*` helpers backed by a `watch` counter,
//! so tests await conditions instead of sleeping. Waits panic after
//! [`WAIT_TIMEOUT`].

use std::time::Duration;
use tokio::sync::watch;

pub mod fixtures;
pub mod producers;
pub mod recording;
pub mod repository;

pub use fixtures::{field, hide, section, sections, uids};
pub use producers::{ScriptedProducer, ScriptedRuleEvaluator, ScriptedSectionSource};
pub use recording::{RecordingErrorReporter, RecordingFormView, RecordingSink, ViewEvent};
pub use repository::{InMemoryFormRepository, StoredValue};

/// Upper bound for every `wait_for_*` helper.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait until the watched counter reaches `target`.
pub(crate) async fn wait_for_count(counter: &watch::Sender<usize>, target: usize, what: &str) {
    let mut rx = counter.subscribe();
    let reached = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(|count| *count >= target)).await;
    match reached {
        Ok(Ok(_)) => {}
        Ok(Err(_)) => panic!("{what}: counter closed before reaching {target}"),
        Err(_) => panic!(
            "{what}: timed out waiting for {target}, have {}",
            *counter.borrow()
        ),
    }
}
