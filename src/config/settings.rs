use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::error::PlaygroundError;

/// Example configuration file contents
pub const EXAMPLE_CONFIG: &str = r#"# Playground configuration
#
# Idle gap (ms) the event loop keeps waiting for the next timer.
# wait_window_ms = 3000
#
# Overall budget (ms) for one run before it is reported as timed out.
# run_timeout_ms = 10000
#
# loop_iteration_limit = 10000000
# recursion_limit = 2048
# max_records = 2000
# update_channel_capacity = 64

[render]
# max_depth = 4
# max_items = 100
# max_string_length = 10000
# break_length = 72
"#;

/// Playground configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaygroundConfig {
    /// Longest idle gap before the next timer that a run keeps waiting for
    pub wait_window: Duration,
    /// Overall budget for a run's asynchronous work
    pub run_timeout: Duration,
    /// Loop iteration cap handed to the engine
    pub loop_iteration_limit: u64,
    /// Call depth cap handed to the engine
    pub recursion_limit: usize,
    /// Maximum number of records kept per run
    pub max_records: usize,
    /// Capacity of the transcript update channel
    pub update_channel_capacity: usize,
    /// Argument rendering limits
    pub render: RenderConfig,
}

/// Limits for turning JavaScript values into transcript text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Nesting depth after which objects render as `[Object]`
    pub max_depth: usize,
    /// Array/object/map/set entries shown before eliding
    pub max_items: usize,
    /// Longest string rendered in full
    pub max_string_length: usize,
    /// Single-line width before a structure breaks onto several lines
    pub break_length: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_items: 100,
            max_string_length: 10_000,
            break_length: 72,
        }
    }
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            wait_window: Duration::from_millis(3_000),
            run_timeout: Duration::from_millis(10_000),
            loop_iteration_limit: 10_000_000,
            recursion_limit: 2048,
            max_records: 2000,
            update_channel_capacity: 64,
            render: RenderConfig::default(),
        }
    }
}

/// TOML representation of render limits
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlRenderConfig {
    pub max_depth: Option<usize>,
    pub max_items: Option<usize>,
    pub max_string_length: Option<usize>,
    pub break_length: Option<usize>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlPlaygroundConfig {
    pub wait_window_ms: Option<u64>,
    pub run_timeout_ms: Option<u64>,
    pub loop_iteration_limit: Option<u64>,
    pub recursion_limit: Option<usize>,
    pub max_records: Option<usize>,
    pub update_channel_capacity: Option<usize>,
    pub render: Option<TomlRenderConfig>,
}

impl PlaygroundConfig {
    /// Parse a TOML document and merge it over the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, PlaygroundError> {
        let toml_config = toml::from_str::<TomlPlaygroundConfig>(contents)?;
        let mut config = Self::default();
        config.merge(toml_config);
        Ok(config)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No playground config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn merge(&mut self, toml_config: TomlPlaygroundConfig) {
        if let Some(ms) = toml_config.wait_window_ms {
            self.wait_window = Duration::from_millis(ms);
        }
        if let Some(ms) = toml_config.run_timeout_ms {
            self.run_timeout = Duration::from_millis(ms);
        }
        if let Some(limit) = toml_config.loop_iteration_limit {
            self.loop_iteration_limit = limit;
        }
        if let Some(limit) = toml_config.recursion_limit {
            self.recursion_limit = limit;
        }
        if let Some(max) = toml_config.max_records {
            self.max_records = max.max(1);
        }
        if let Some(capacity) = toml_config.update_channel_capacity {
            self.update_channel_capacity = capacity.max(1);
        }
        if let Some(render) = toml_config.render {
            if let Some(depth) = render.max_depth {
                self.render.max_depth = depth;
            }
            if let Some(items) = render.max_items {
                self.render.max_items = items;
            }
            if let Some(len) = render.max_string_length {
                self.render.max_string_length = len;
            }
            if let Some(width) = render.break_length {
                self.render.break_length = width;
            }
        }
    }

    pub fn with_wait_window(mut self, wait_window: Duration) -> Self {
        self.wait_window = wait_window;
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    pub fn with_loop_iteration_limit(mut self, limit: u64) -> Self {
        self.loop_iteration_limit = limit;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }
}
