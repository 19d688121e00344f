//! Injected execution contexts.
//!
//! The pipeline never owns a runtime. Callers hand it three logical
//! contexts, each backed by a Tokio runtime handle: background I/O, rule
//! computation, and presentation.

use forma_core::PipelineError;
use std::fmt;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// One logical execution context.
#[derive(Clone)]
pub struct Scheduler {
    name: &'static str,
    handle: Handle,
}

impl Scheduler {
    /// Context backed by `handle`.
    pub fn new(name: &'static str, handle: Handle) -> Self {
        Self { name, handle }
    }

    /// Context backed by the ambient runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime. Use [`Scheduler::try_current`]
    /// where that is possible.
    pub fn current(name: &'static str) -> Self {
        Self::new(name, Handle::current())
    }

    /// Context backed by the ambient runtime, if there is one.
    pub fn try_current(name: &'static str) -> Result<Self, PipelineError> {
        Handle::try_current()
            .map(|handle| Self::new(name, handle))
            .map_err(|_| PipelineError::NoRuntime)
    }

    /// Context name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler").field("name", &self.name).finish()
    }
}

/// The three contexts the pipeline dispatches onto.
#[derive(Clone, Debug)]
pub struct Schedulers {
    /// Storage reads and writes
    pub io: Scheduler,
    /// Rule evaluation
    pub computation: Scheduler,
    /// UI delivery, serialized by the presentation queue
    pub presentation: Scheduler,
}

impl Schedulers {
    /// All three contexts on one runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            io: Scheduler::new("io", handle.clone()),
            computation: Scheduler::new("computation", handle.clone()),
            presentation: Scheduler::new("presentation", handle),
        }
    }

    /// All three contexts on the ambient runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn current() -> Self {
        Self::from_handle(Handle::current())
    }

    /// All three contexts on the ambient runtime, if there is one.
    pub fn try_current() -> Result<Self, PipelineError> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|_| PipelineError::NoRuntime)
    }
}
