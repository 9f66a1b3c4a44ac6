use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snippet::SnippetId;
use crate::engine::{ErrorInfo, RunOutcome};
use crate::transcript::{OutputRecord, RunToken};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Running,
    Completed,
    Errored,
    TimedOut,
}

impl RunStatus {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed { .. } => RunStatus::Completed,
            RunOutcome::Timeout { .. } => RunStatus::TimedOut,
            RunOutcome::CompileError { .. }
            | RunOutcome::RuntimeError { .. }
            | RunOutcome::InterceptorFault { .. } => RunStatus::Errored,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Errored => "errored",
            RunStatus::TimedOut => "timedOut",
        }
    }
}

/// Whether a widget currently has a run in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetState {
    Idle,
    Running,
}

/// One execution of a snippet and everything it printed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: RunToken,
    pub snippet_id: SnippetId,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub records: Vec<OutputRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_error: Option<ErrorInfo>,
    /// Timers abandoned when the run stopped waiting
    #[serde(default)]
    pub dropped_timers: usize,
}

impl Run {
    pub fn new(id: RunToken, snippet_id: SnippetId) -> Self {
        Self {
            id,
            snippet_id,
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            records: Vec::new(),
            terminal_error: None,
            dropped_timers: 0,
        }
    }

    /// Move to the terminal status described by `outcome`.
    pub fn finish(&mut self, outcome: &RunOutcome) {
        self.status = RunStatus::from_outcome(outcome);
        self.terminal_error = outcome.error().cloned();
        self.dropped_timers = outcome.dropped_timers();
        self.finished_at = Some(Utc::now());
    }

    /// Transcript lines as a console would show them.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.is_visible())
            .map(|r| r.indented_text())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ErrorPhase;
    use crate::error::ErrorKind;
    use crate::transcript::OutputKind;

    #[test]
    fn test_status_from_outcome() {
        let error = ErrorInfo::new(
            ErrorKind::SynchronousRuntimeError,
            ErrorPhase::Synchronous,
            Some("Error".into()),
            "x".into(),
        );
        assert_eq!(
            RunStatus::from_outcome(&RunOutcome::Completed { dropped_timers: 0 }),
            RunStatus::Completed
        );
        assert_eq!(
            RunStatus::from_outcome(&RunOutcome::RuntimeError { error: error.clone() }),
            RunStatus::Errored
        );
        assert_eq!(
            RunStatus::from_outcome(&RunOutcome::Timeout {
                error,
                pending_timers: 1
            }),
            RunStatus::TimedOut
        );
    }

    #[test]
    fn test_finish_records_error_and_drops() {
        let mut run = Run::new(RunToken::new(1), SnippetId::new());
        assert!(!run.status.is_terminal());
        run.finish(&RunOutcome::Completed { dropped_timers: 2 });
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.dropped_timers, 2);
        assert!(run.terminal_error.is_none());
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_lines_skip_group_end() {
        let record = |sequence, kind, text: &str, depth| OutputRecord {
            sequence,
            kind,
            args: vec![],
            text: text.into(),
            depth,
            elapsed_ms: 0,
        };
        let mut run = Run::new(RunToken::new(1), SnippetId::new());
        run.records = vec![
            record(1, OutputKind::Group, "g", 0),
            record(2, OutputKind::Log, "in", 1),
            record(3, OutputKind::GroupEnd, "", 0),
            record(4, OutputKind::Log, "out", 0),
        ];
        assert_eq!(run.lines(), vec!["g", "  in", "out"]);
    }
}
