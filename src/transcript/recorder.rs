use std::cell::RefCell;
use std::rc::Rc;

use super::record::{OutputKind, OutputRecord, PendingRecord, RunToken};
use crate::util::logging::DIAGNOSTICS_TARGET;

/// Ordered, append-only log of the active run's console output.
///
/// The recorder only accepts records tagged with its active generation. A
/// callback that belongs to a superseded run still reaches `append`, but its
/// record is dropped here.
#[derive(Debug)]
pub struct OutputRecorder {
    active: Option<RunToken>,
    records: Vec<OutputRecord>,
    next_sequence: u64,
    max_records: usize,
    truncated: bool,
}

impl OutputRecorder {
    pub fn new(max_records: usize) -> Self {
        Self {
            active: None,
            records: Vec::new(),
            next_sequence: 1,
            max_records: max_records.max(1),
            truncated: false,
        }
    }

    /// Begin a new generation, discarding the previous run's records.
    pub fn reset(&mut self, token: RunToken) {
        self.active = Some(token);
        self.records.clear();
        self.next_sequence = 1;
        self.truncated = false;
    }

    /// Stop accepting records for any run.
    pub fn close(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<RunToken> {
        self.active
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        self.active == Some(token)
    }

    /// Append a record and return its sequence number.
    ///
    /// Returns `None` when the token is stale or the buffer is full.
    pub fn append(&mut self, token: RunToken, pending: PendingRecord) -> Option<u64> {
        if !self.is_current(token) {
            tracing::trace!(
                target: DIAGNOSTICS_TARGET,
                run = %token,
                kind = pending.kind.label(),
                "Dropping record from superseded run"
            );
            return None;
        }

        if self.records.len() >= self.max_records {
            if !self.truncated {
                self.truncated = true;
                let notice = PendingRecord::new(
                    OutputKind::Diagnostic,
                    format!(
                        "Output truncated after {} entries",
                        self.max_records
                    ),
                )
                .at(pending.elapsed_ms);
                self.push(notice);
            }
            return None;
        }

        Some(self.push(pending))
    }

    fn push(&mut self, pending: PendingRecord) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push(OutputRecord {
            sequence,
            kind: pending.kind,
            args: pending.args,
            text: pending.text,
            depth: pending.depth,
            elapsed_ms: pending.elapsed_ms,
        });
        sequence
    }

    /// Ordered copy of every record of the active run.
    pub fn snapshot(&self) -> Vec<OutputRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Shared handle to a widget's recorder.
///
/// The engine is single-threaded, so the recorder is shared by `Rc` between
/// the controller and the native console functions of the active run.
#[derive(Debug, Clone)]
pub struct RecorderHandle(Rc<RefCell<OutputRecorder>>);

impl RecorderHandle {
    pub fn new(max_records: usize) -> Self {
        Self(Rc::new(RefCell::new(OutputRecorder::new(max_records))))
    }

    pub fn reset(&self, token: RunToken) {
        self.0.borrow_mut().reset(token);
    }

    pub fn close(&self) {
        self.0.borrow_mut().close();
    }

    pub fn append(&self, token: RunToken, pending: PendingRecord) -> Option<u64> {
        self.0.borrow_mut().append(token, pending)
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        self.0.borrow().is_current(token)
    }

    pub fn snapshot(&self) -> Vec<OutputRecord> {
        self.0.borrow().snapshot()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}
