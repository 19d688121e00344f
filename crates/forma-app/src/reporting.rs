//! Default error reporter.

use forma_core::{ErrorReporter, FormError};

/// Reports every failure as a `tracing` error event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &FormError) {
        match error.stream() {
            Some(stream) => tracing::error!(%stream, %error, "form stream error"),
            None => tracing::error!(%error, "form storage error"),
        }
    }
}
