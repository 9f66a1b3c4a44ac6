use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::RenderedValue;

/// Identity of one run: a generation number, unique per widget.
///
/// Everything bound to a run (console, timers, records) carries the token it
/// was created with; work carrying a stale token is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunToken(u64);

impl RunToken {
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// What produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputKind {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Trace,
    Dir,
    Table,
    Group,
    GroupCollapsed,
    GroupEnd,
    Assert,
    Count,
    /// `time`, `timeLog` and `timeEnd` output
    Time,
    Clear,
    /// An uncaught exception or unhandled rejection
    Uncaught,
    /// Emitted by the playground itself (truncation notices)
    Diagnostic,
    /// A console method outside the known set, by name
    Other(String),
}

impl OutputKind {
    /// Get a short label for display
    pub fn label(&self) -> &str {
        match self {
            OutputKind::Log => "log",
            OutputKind::Info => "info",
            OutputKind::Warn => "warn",
            OutputKind::Error => "error",
            OutputKind::Debug => "debug",
            OutputKind::Trace => "trace",
            OutputKind::Dir => "dir",
            OutputKind::Table => "table",
            OutputKind::Group => "group",
            OutputKind::GroupCollapsed => "groupCollapsed",
            OutputKind::GroupEnd => "groupEnd",
            OutputKind::Assert => "assert",
            OutputKind::Count => "count",
            OutputKind::Time => "time",
            OutputKind::Clear => "clear",
            OutputKind::Uncaught => "uncaught",
            OutputKind::Diagnostic => "diagnostic",
            OutputKind::Other(name) => name,
        }
    }

    /// Whether the record should be styled as an error
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            OutputKind::Error | OutputKind::Assert | OutputKind::Uncaught
        )
    }
}

/// One intercepted console call or runtime error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub sequence: u64,
    pub kind: OutputKind,
    pub args: Vec<RenderedValue>,
    /// The line a console would print for this call
    pub text: String,
    /// `console.group` nesting level when the call happened
    pub depth: usize,
    /// Logical milliseconds since the run started
    pub elapsed_ms: u64,
}

impl OutputRecord {
    /// Whether the record occupies a line. `groupEnd` only closes a group.
    pub fn is_visible(&self) -> bool {
        !(matches!(self.kind, OutputKind::GroupEnd) && self.text.is_empty())
    }

    /// Text with group indentation applied, one entry per output line.
    pub fn indented_text(&self) -> String {
        if self.depth == 0 {
            return self.text.clone();
        }
        let pad = "  ".repeat(self.depth);
        self.text
            .lines()
            .map(|line| format!("{pad}{line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A record waiting for its sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub kind: OutputKind,
    pub args: Vec<RenderedValue>,
    pub text: String,
    pub depth: usize,
    pub elapsed_ms: u64,
}

impl PendingRecord {
    pub fn new(kind: OutputKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            args: Vec::new(),
            text: text.into(),
            depth: 0,
            elapsed_ms: 0,
        }
    }

    pub fn with_args(mut self, args: Vec<RenderedValue>) -> Self {
        self.args = args;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn at(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }
}
