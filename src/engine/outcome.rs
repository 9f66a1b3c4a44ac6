use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::inspect::Thrown;
use crate::error::ErrorKind;
use crate::transcript::format::error_headline;

/// Where in the event loop an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorPhase {
    Synchronous,
    Microtask,
    Macrotask,
    Timeout,
}

/// Description of an error that ended or marred a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    /// Error class name (`TypeError`, a custom subclass); `None` for thrown
    /// non-error values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub phase: ErrorPhase,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, phase: ErrorPhase, name: Option<String>, message: String) -> Self {
        Self {
            kind,
            name,
            message,
            stack: None,
            phase,
        }
    }

    pub fn from_thrown(thrown: &Thrown, kind: ErrorKind, phase: ErrorPhase) -> Self {
        Self::new(kind, phase, thrown.name.clone(), thrown.message.clone())
            .with_stack(thrown.stack.clone())
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack.filter(|s| !s.is_empty());
        self
    }

    /// `Name: message`, or the message alone for thrown non-errors.
    pub fn headline(&self) -> String {
        error_headline(self.name.as_deref().unwrap_or_default(), &self.message)
    }

    /// Text of the `uncaught` transcript record for this error.
    pub fn uncaught_text(&self) -> String {
        match self.phase {
            ErrorPhase::Microtask => format!("Uncaught (in promise) {}", self.headline()),
            _ => format!("Uncaught {}", self.headline()),
        }
    }

    /// Text for an error thrown straight out of a `queueMicrotask` callback,
    /// which is not a promise rejection.
    pub fn uncaught_callback_text(&self) -> String {
        format!("Uncaught {}", self.headline())
    }

    pub fn timeout(budget: Duration) -> Self {
        Self::new(
            ErrorKind::TimeoutExceeded,
            ErrorPhase::Timeout,
            None,
            format!(
                "Stopped waiting after {}ms; pending timers were discarded",
                budget.as_millis()
            ),
        )
    }

    /// Generic error shown when the playground machinery failed.
    pub fn internal(phase: ErrorPhase) -> Self {
        Self::new(
            ErrorKind::InterceptorFault,
            phase,
            Some("InternalError".to_string()),
            "The playground could not capture console output for this run".to_string(),
        )
    }
}

/// Closed set of results of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RunOutcome {
    /// The event loop drained. `dropped_timers` counts timers due beyond the
    /// wait window that were abandoned.
    Completed { dropped_timers: usize },
    CompileError { error: ErrorInfo },
    RuntimeError { error: ErrorInfo },
    Timeout {
        error: ErrorInfo,
        pending_timers: usize,
    },
    InterceptorFault { error: ErrorInfo },
}

impl RunOutcome {
    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            RunOutcome::Completed { .. } => None,
            RunOutcome::CompileError { error }
            | RunOutcome::RuntimeError { error }
            | RunOutcome::Timeout { error, .. }
            | RunOutcome::InterceptorFault { error } => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    pub fn dropped_timers(&self) -> usize {
        match self {
            RunOutcome::Completed { dropped_timers } => *dropped_timers,
            RunOutcome::Timeout { pending_timers, .. } => *pending_timers,
            _ => 0,
        }
    }
}
