mod cli;
pub mod env;
mod validation;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

/// Verbosity of the encoder's own diagnostics.
///
/// This is distinct from `domain::LogLevel`, the severity carried by the
/// events being encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl TracingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TracingLevel::Error => "error",
            TracingLevel::Warn => "warn",
            TracingLevel::Info => "info",
            TracingLevel::Debug => "debug",
            TracingLevel::Trace => "trace",
        }
    }
}

impl FromStr for TracingLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(TracingLevel::Error),
            "warn" | "warning" => Ok(TracingLevel::Warn),
            "info" => Ok(TracingLevel::Info),
            "debug" => Ok(TracingLevel::Debug),
            "trace" => Ok(TracingLevel::Trace),
            _ => Err(ConfigError::EnvError(format!(
                "Invalid log level '{s}'. Valid levels: error, warn, info, debug, trace"
            ))),
        }
    }
}

impl From<TracingLevel> for tracing::Level {
    fn from(level: TracingLevel) -> Self {
        match level {
            TracingLevel::Error => tracing::Level::ERROR,
            TracingLevel::Warn => tracing::Level::WARN,
            TracingLevel::Info => tracing::Level::INFO,
            TracingLevel::Debug => tracing::Level::DEBUG,
            TracingLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Output format of the encoder's own diagnostics (always on stderr).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

/// What the front end does with an event the encoder rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Skip the event and log a warning
    #[default]
    Drop,
    /// Emit a fallback payload describing the failure instead
    Fallback,
}

pub use cli::Config;
