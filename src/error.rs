//! Crate-level error types.
//!
//! Errors raised by snippet code never surface here: they are converted into
//! [`ErrorInfo`](crate::engine::ErrorInfo) values and travel inside run
//! outcomes. `PlaygroundError` covers failures of the playground machinery
//! itself.

use serde::{Deserialize, Serialize};

/// Error type for playground operations.
#[derive(Debug, thiserror::Error)]
pub enum PlaygroundError {
    /// The JavaScript engine could not be constructed or prepared.
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    /// The console interceptor could not be installed or restored.
    #[error("Console interceptor fault: {0}")]
    InterceptorFault(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// The widget driver is no longer running.
    #[error("Playground widget is shut down")]
    Closed,
}

/// Classification of everything that can end or mar a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Snippet text is not valid JavaScript; nothing was executed.
    CompileError,
    /// Thrown during the initial synchronous pass.
    SynchronousRuntimeError,
    /// Thrown or rejected in a later microtask or timer callback.
    AsynchronousRuntimeError,
    /// The run budget elapsed before the event loop drained.
    TimeoutExceeded,
    /// The console wrapping machinery itself failed.
    InterceptorFault,
}

impl ErrorKind {
    /// Whether the error should be presented as a hard failure.
    ///
    /// Timeouts are shown as a soft "stopped waiting" state.
    pub fn is_hard_failure(&self) -> bool {
        !matches!(self, ErrorKind::TimeoutExceeded)
    }
}
