//! Logging settings as read from the `logging` section of the config file

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Verbosity threshold, written in lowercase in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Spelling understood by `EnvFilter` directives
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Line format for every sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event, for log shippers
    Json,
}

/// Which sinks receive events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

/// Roll-over cadence of the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// `logging` section of the gatekeeper configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Where log files go; `logs/` when unset
    #[serde(default)]
    pub log_directory: Option<PathBuf>,

    /// Per-target overrides, e.g. `asset_gatekeeper::entitlement: debug`
    #[serde(default)]
    pub module_levels: HashMap<String, LogLevel>,

    #[serde(default = "enabled")]
    pub include_target: bool,

    #[serde(default)]
    pub include_thread_id: bool,

    /// Adds source file and line to each event
    #[serde(default)]
    pub include_file_info: bool,

    #[serde(default)]
    pub rotation: LogRotation,
}

fn enabled() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            log_directory: None,
            module_levels: HashMap::new(),
            include_target: true,
            include_thread_id: false,
            include_file_info: false,
            rotation: LogRotation::default(),
        }
    }
}

impl LoggingConfig {
    /// Whether events also go to a rolling file
    pub fn writes_file(&self) -> bool {
        matches!(self.output, LogOutput::File | LogOutput::Both)
    }
}
