//! Configuration structures for streamframe.
//!
//! Configuration is loaded from TOML files and can be overridden via CLI flags.

use crate::buffer::{EvictionWindow, PushAction, StreamingFrameOptions};
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Streaming buffer configuration
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Monitoring configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Streaming buffer configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BufferConfig {
    /// Maximum number of rows kept (unbounded when absent)
    #[serde(default)]
    pub max_length: Option<usize>,

    /// Maximum span between oldest and newest time ordinate
    #[serde(default)]
    pub max_delta: Option<f64>,

    /// Push action
    #[serde(default)]
    pub action: PushAction,
}

impl BufferConfig {
    /// Eviction window described by this section.
    pub fn window(&self) -> EvictionWindow {
        EvictionWindow {
            max_length: self.max_length,
            max_delta: self.max_delta,
        }
    }

    /// Validated frame options.
    pub fn options(&self) -> crate::Result<StreamingFrameOptions> {
        let window = self.window();
        window.validate()?;
        Ok(StreamingFrameOptions::new(window).with_action(self.action))
    }
}

/// Monitoring configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log format
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Plain text format
    Text,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if self.buffer.max_length == Some(0) {
            return Err(crate::Error::Config(
                "buffer.max_length must be at least 1".into(),
            ));
        }

        if let Some(delta) = self.buffer.max_delta {
            if !delta.is_finite() || delta < 0.0 {
                return Err(crate::Error::Config(format!(
                    "buffer.max_delta must be a finite number >= 0, got {delta}"
                )));
            }
        }

        if self.buffer.max_length.is_none() && self.buffer.max_delta.is_none() {
            tracing::warn!("Buffer has neither max_length nor max_delta; it will grow unbounded");
        }

        Ok(())
    }
}
