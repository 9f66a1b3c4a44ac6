//! Per-widget run orchestration: starting, superseding and finishing runs,
//! and publishing transcript updates.

use tokio::sync::broadcast;
use tokio::time::Instant;

use super::events::TranscriptUpdate;
use super::run::{Run, WidgetState};
use super::snippet::Snippet;
use crate::config::PlaygroundConfig;
use crate::engine::{Execution, ExecutionEngine};
use crate::error::PlaygroundError;
use crate::transcript::{RecorderHandle, RunToken};

/// Owns a widget's page and at most one running [`Run`].
pub struct RunSessionController {
    engine: ExecutionEngine,
    recorder: RecorderHandle,
    current: Option<Run>,
    execution: Option<Execution>,
    last_token: RunToken,
    published_records: Option<usize>,
    updates: broadcast::Sender<TranscriptUpdate>,
}

impl RunSessionController {
    pub fn new(config: PlaygroundConfig) -> Result<Self, PlaygroundError> {
        let engine = ExecutionEngine::new(config)?;
        let (updates, _) = broadcast::channel(config.update_channel_capacity.max(1));
        Ok(Self {
            engine,
            recorder: RecorderHandle::new(config.max_records),
            current: None,
            execution: None,
            last_token: RunToken::new(0),
            published_records: None,
            updates,
        })
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ExecutionEngine {
        &mut self.engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptUpdate> {
        self.updates.subscribe()
    }

    /// Sender side of the update channel, for handles created elsewhere.
    pub fn updates(&self) -> broadcast::Sender<TranscriptUpdate> {
        self.updates.clone()
    }

    /// Most recent run, running or terminal.
    pub fn active_run(&self) -> Option<&Run> {
        self.current.as_ref()
    }

    pub fn state(&self) -> WidgetState {
        if self.execution.is_some() {
            WidgetState::Running
        } else {
            WidgetState::Idle
        }
    }

    /// Start running `snippet`, superseding any run in progress.
    pub fn start(&mut self, snippet: &Snippet) -> Result<RunToken, PlaygroundError> {
        self.start_at(snippet, Instant::now())
    }

    pub fn start_at(&mut self, snippet: &Snippet, now: Instant) -> Result<RunToken, PlaygroundError> {
        let token = self.last_token.next();
        self.last_token = token;

        // New generation first, so anything the old run still emits is stale.
        self.recorder.reset(token);
        if let Some(previous) = self.execution.take() {
            tracing::debug!(previous = %previous.token(), run = %token, "Superseding run");
            self.engine.cancel(previous);
        }

        let console = match self.engine.bind_console(self.recorder.clone(), token) {
            Ok(console) => console,
            Err(e) => {
                // The superseded run is gone; don't keep reporting it.
                self.current = None;
                self.published_records = None;
                self.recorder.close();
                tracing::warn!(run = %token, error = %e, "Could not start run");
                return Err(e);
            }
        };
        tracing::info!(run = %token, snippet = %snippet.id(), "Starting run");

        self.current = Some(Run::new(token, snippet.id()));
        self.published_records = None;
        let execution = self.engine.begin(snippet.source(), console, now);
        self.execution = Some(execution);
        self.sync();
        Ok(token)
    }

    /// Fire whatever is due at `now` and publish what changed.
    pub fn poll(&mut self, now: Instant) {
        if let Some(execution) = self.execution.as_mut() {
            self.engine.advance(execution, now);
            self.sync();
        }
    }

    /// When [`RunSessionController::poll`] next has work to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.execution
            .as_ref()
            .and_then(|execution| self.engine.next_wakeup(execution))
    }

    /// Drive the current run on the tokio clock until it is terminal.
    pub async fn drive_until_settled(&mut self) -> Option<&Run> {
        while let Some(at) = self.next_wakeup() {
            tokio::time::sleep_until(at).await;
            self.poll(Instant::now());
        }
        self.current.as_ref()
    }

    /// Abandon any running run. The widget is unmounting.
    pub fn shutdown(&mut self) {
        if let Some(execution) = self.execution.take() {
            tracing::debug!(run = %execution.token(), "Cancelling run on shutdown");
            self.engine.cancel(execution);
        }
        self.recorder.close();
        self.current = None;
    }

    fn sync(&mut self) {
        let Some(run) = self.current.as_mut() else {
            return;
        };
        let record_count = self.recorder.len();
        let grew = self.published_records != Some(record_count);
        if grew {
            run.records = self.recorder.snapshot();
        }

        let mut finished = false;
        if let Some(outcome) = self.execution.as_ref().and_then(|e| e.outcome()) {
            run.finish(outcome);
            finished = true;
        }
        if finished {
            self.execution = None;
            self.recorder.close();
            tracing::info!(
                run = %run.id,
                status = run.status.as_str(),
                records = run.records.len(),
                "Run settled"
            );
        }

        if grew || finished {
            self.published_records = Some(record_count);
            // No subscribers is fine; the run is still kept for `active_run`.
            let _ = self.updates.send(TranscriptUpdate::from_run(run));
        }
    }
}

impl Drop for RunSessionController {
    fn drop(&mut self) {
        if self.execution.is_some() {
            self.shutdown();
        }
    }
}
