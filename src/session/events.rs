use serde::{Deserialize, Serialize};

use super::run::{Run, RunStatus};
use super::snippet::SnippetId;
use crate::engine::ErrorInfo;
use crate::transcript::{OutputRecord, RunToken};

/// Snapshot of a run's transcript sent to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptUpdate {
    pub snippet_id: SnippetId,
    pub run_id: RunToken,
    pub status: RunStatus,
    pub records: Vec<OutputRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub dropped_timers: usize,
}

impl TranscriptUpdate {
    pub fn from_run(run: &Run) -> Self {
        Self {
            snippet_id: run.snippet_id,
            run_id: run.id,
            status: run.status,
            records: run.records.clone(),
            error: run.terminal_error.clone(),
            dropped_timers: run.dropped_timers,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record texts in order, for quick inspection.
    pub fn texts(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.is_visible())
            .map(|r| r.text.as_str())
            .collect()
    }
}
