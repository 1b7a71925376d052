//! Logging configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Log severity level, most verbose first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Level after `steps` increases in verbosity (`-v` flags)
    pub fn raised(self, steps: u8) -> Self {
        const ORDER: [LogLevel; 5] = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let current = ORDER.iter().position(|l| *l == self).unwrap_or(2);
        let idx = (current + steps as usize).min(ORDER.len() - 1);
        ORDER[idx]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log level for this crate
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    /// Level for HTTP client internals (reqwest, hyper)
    #[serde(default = "default_dependency_level")]
    pub dependency_level: LogLevel,
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_dependency_level() -> LogLevel {
    LogLevel::Warn
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
            dependency_level: default_dependency_level(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive string, with the crate level raised by `verbose`
    pub fn filter_directive(&self, verbose: u8) -> String {
        format!(
            "{},pricescout={},reqwest={},hyper={},html5ever=error",
            self.dependency_level,
            self.level.raised(verbose),
            self.dependency_level,
            self.dependency_level
        )
    }
}
