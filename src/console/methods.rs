//! Console method semantics on already-rendered arguments.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RenderConfig;
use crate::transcript::{
    format_console_args, format_top_level, render_table, OutputKind, PendingRecord,
    RenderedValue,
};

/// Methods the run console defines as own properties.
pub const CONSOLE_METHODS: [&str; 19] = [
    "log",
    "info",
    "warn",
    "error",
    "debug",
    "dir",
    "dirxml",
    "trace",
    "assert",
    "count",
    "countReset",
    "time",
    "timeLog",
    "timeEnd",
    "group",
    "groupCollapsed",
    "groupEnd",
    "table",
    "clear",
];

const DEFAULT_LABEL: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleMethod {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Dir,
    Dirxml,
    Trace,
    Assert,
    Count,
    CountReset,
    Time,
    TimeLog,
    TimeEnd,
    Group,
    GroupCollapsed,
    GroupEnd,
    Table,
    Clear,
    /// Anything else a snippet calls on `console`
    Other(String),
}

impl ConsoleMethod {
    pub fn from_name(name: &str) -> Self {
        match name {
            "log" => Self::Log,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            "debug" => Self::Debug,
            "dir" => Self::Dir,
            "dirxml" => Self::Dirxml,
            "trace" => Self::Trace,
            "assert" => Self::Assert,
            "count" => Self::Count,
            "countReset" => Self::CountReset,
            "time" => Self::Time,
            "timeLog" => Self::TimeLog,
            "timeEnd" => Self::TimeEnd,
            "group" => Self::Group,
            "groupCollapsed" => Self::GroupCollapsed,
            "groupEnd" => Self::GroupEnd,
            "table" => Self::Table,
            "clear" => Self::Clear,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Dir => "dir",
            Self::Dirxml => "dirxml",
            Self::Trace => "trace",
            Self::Assert => "assert",
            Self::Count => "count",
            Self::CountReset => "countReset",
            Self::Time => "time",
            Self::TimeLog => "timeLog",
            Self::TimeEnd => "timeEnd",
            Self::Group => "group",
            Self::GroupCollapsed => "groupCollapsed",
            Self::GroupEnd => "groupEnd",
            Self::Table => "table",
            Self::Clear => "clear",
            Self::Other(name) => name,
        }
    }

    /// Record kind for the method's primary output.
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::Log => OutputKind::Log,
            Self::Info => OutputKind::Info,
            Self::Warn => OutputKind::Warn,
            Self::Error => OutputKind::Error,
            Self::Debug => OutputKind::Debug,
            Self::Dir | Self::Dirxml => OutputKind::Dir,
            Self::Trace => OutputKind::Trace,
            Self::Assert => OutputKind::Assert,
            Self::Count | Self::CountReset => OutputKind::Count,
            Self::Time | Self::TimeLog | Self::TimeEnd => OutputKind::Time,
            Self::Group => OutputKind::Group,
            Self::GroupCollapsed => OutputKind::GroupCollapsed,
            Self::GroupEnd => OutputKind::GroupEnd,
            Self::Table => OutputKind::Table,
            Self::Clear => OutputKind::Clear,
            Self::Other(name) => OutputKind::Other(name.clone()),
        }
    }
}

/// Per-run console state: group nesting, counters and timers.
#[derive(Debug, Default)]
pub struct ConsoleState {
    depth: usize,
    counts: HashMap<String, u64>,
    timers: HashMap<String, Instant>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Apply one console call and return the records it produces.
    pub fn apply(
        &mut self,
        method: &ConsoleMethod,
        args: Vec<RenderedValue>,
        now: Instant,
        config: &RenderConfig,
    ) -> Vec<PendingRecord> {
        let depth = self.depth;
        let line = |kind: OutputKind, text: String, args: Vec<RenderedValue>| {
            PendingRecord::new(kind, text)
                .with_args(args)
                .with_depth(depth)
        };

        match method {
            ConsoleMethod::Log
            | ConsoleMethod::Info
            | ConsoleMethod::Warn
            | ConsoleMethod::Error
            | ConsoleMethod::Debug
            | ConsoleMethod::Dir
            | ConsoleMethod::Dirxml
            | ConsoleMethod::Other(_) => {
                let text = format_console_args(&args, config);
                vec![line(method.kind(), text, args)]
            }
            ConsoleMethod::Trace => {
                let message = format_console_args(&args, config);
                let text = if message.is_empty() {
                    "Trace".to_string()
                } else {
                    format!("Trace: {message}")
                };
                vec![line(OutputKind::Trace, text, args)]
            }
            ConsoleMethod::Assert => {
                if args.first().is_some_and(is_truthy) {
                    return Vec::new();
                }
                let rest: Vec<RenderedValue> = args.into_iter().skip(1).collect();
                let message = format_console_args(&rest, config);
                let text = if message.is_empty() {
                    "Assertion failed".to_string()
                } else {
                    format!("Assertion failed: {message}")
                };
                vec![line(OutputKind::Assert, text, rest)]
            }
            ConsoleMethod::Count => {
                let label = label_of(&args, config);
                let count = self.counts.entry(label.clone()).or_insert(0);
                *count += 1;
                vec![line(OutputKind::Count, format!("{label}: {count}"), args)]
            }
            ConsoleMethod::CountReset => {
                let label = label_of(&args, config);
                match self.counts.get_mut(&label) {
                    Some(count) => {
                        *count = 0;
                        Vec::new()
                    }
                    None => vec![line(
                        OutputKind::Warn,
                        format!("Count for '{label}' does not exist"),
                        args,
                    )],
                }
            }
            ConsoleMethod::Time => {
                let label = label_of(&args, config);
                if self.timers.contains_key(&label) {
                    return vec![line(
                        OutputKind::Warn,
                        format!("Label '{label}' already exists for console.time()"),
                        args,
                    )];
                }
                self.timers.insert(label, now);
                Vec::new()
            }
            ConsoleMethod::TimeLog | ConsoleMethod::TimeEnd => {
                let label = label_of(&args, config);
                let started = if *method == ConsoleMethod::TimeEnd {
                    self.timers.remove(&label)
                } else {
                    self.timers.get(&label).copied()
                };
                let Some(started) = started else {
                    return vec![line(
                        OutputKind::Warn,
                        format!("No such label '{label}' for console.{}()", method.name()),
                        args,
                    )];
                };
                let mut text = format!(
                    "{label}: {}",
                    format_duration(now.saturating_duration_since(started))
                );
                if *method == ConsoleMethod::TimeLog && args.len() > 1 {
                    text.push(' ');
                    text.push_str(&format_console_args(&args[1..], config));
                }
                vec![line(OutputKind::Time, text, args)]
            }
            ConsoleMethod::Group | ConsoleMethod::GroupCollapsed => {
                let text = format_console_args(&args, config);
                self.depth += 1;
                vec![line(method.kind(), text, args)]
            }
            ConsoleMethod::GroupEnd => {
                self.depth = self.depth.saturating_sub(1);
                vec![PendingRecord::new(OutputKind::GroupEnd, "").with_depth(self.depth)]
            }
            ConsoleMethod::Table => {
                let columns = args.get(1).and_then(column_names);
                match args
                    .first()
                    .and_then(|data| render_table(data, columns.as_deref(), config))
                {
                    Some(table) => vec![line(OutputKind::Table, table, args)],
                    None => {
                        let text = format_console_args(&args, config);
                        vec![line(OutputKind::Log, text, args)]
                    }
                }
            }
            ConsoleMethod::Clear => {
                self.depth = 0;
                vec![PendingRecord::new(OutputKind::Clear, "Console was cleared")]
            }
        }
    }
}

fn label_of(args: &[RenderedValue], config: &RenderConfig) -> String {
    match args.first() {
        None | Some(RenderedValue::Undefined) => DEFAULT_LABEL.to_string(),
        Some(value) => format_top_level(value, config),
    }
}

fn column_names(value: &RenderedValue) -> Option<Vec<String>> {
    match value {
        RenderedValue::Array { items, .. } => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    RenderedValue::String { value, .. } => Some(value.clone()),
                    RenderedValue::Number { value } => Some(value.clone()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// JavaScript truthiness of a rendered value.
pub fn is_truthy(value: &RenderedValue) -> bool {
    match value {
        RenderedValue::Undefined | RenderedValue::Null => false,
        RenderedValue::Boolean { value } => *value,
        RenderedValue::Number { value } => !matches!(value.as_str(), "0" | "-0" | "NaN"),
        RenderedValue::BigInt { value } => value != "0",
        RenderedValue::String { value, truncated } => !value.is_empty() || *truncated > 0,
        _ => true,
    }
}

/// `12.345ms` below one second, `1.234s` above.
fn format_duration(elapsed: Duration) -> String {
    let ms = elapsed.as_secs_f64() * 1000.0;
    if ms < 1000.0 {
        format!("{ms:.3}ms")
    } else {
        format!("{:.3}s", ms / 1000.0)
    }
}
