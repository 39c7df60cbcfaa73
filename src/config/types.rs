//! Typed configuration structures
//!
//! Provides strongly-typed access to configuration values with validation
//! and default values.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::media::engine::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_THINKING_BUDGET};
use crate::progress::DEFAULT_TICK_INTERVAL;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Reasoning engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Scan history configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Progress feed configuration
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.history.capacity == 0 {
            errors.push(ValidationError {
                path: "history.capacity".to_string(),
                message: "must keep at least one record".to_string(),
            });
        }

        if self.progress.interval_ms == 0 {
            errors.push(ValidationError {
                path: "progress.intervalMs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.engine.model.trim().is_empty() {
            errors.push(ValidationError {
                path: "engine.model".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if url::Url::parse(&self.engine.base_url).is_err() {
            errors.push(ValidationError {
                path: "engine.baseUrl".to_string(),
                message: format!("not a valid URL: {}", self.engine.base_url),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolved history file location.
    pub fn history_path(&self) -> PathBuf {
        self.history
            .path
            .clone()
            .unwrap_or_else(default_history_path)
    }

    /// Cadence of progress lines.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.progress.interval_ms)
    }
}

/// Validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Reasoning engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// API key (prefer the GEMINI_API_KEY environment variable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Reasoning token budget
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            thinking_budget: default_thinking_budget(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_thinking_budget() -> u32 {
    DEFAULT_THINKING_BUDGET
}

/// Scan history configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// History file; defaults to the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Maximum number of records retained
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

/// Default history file: `<data_dir>/forensight/history.json`.
pub fn default_history_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("forensight")
        .join("history.json")
}

/// Progress feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressConfig {
    /// Milliseconds between progress lines
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level or filter directive (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history.capacity, 10);
        assert_eq!(config.progress.interval_ms, 1500);
        assert_eq!(config.engine.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity_and_interval() {
        let mut config = Config::default();
        config.history.capacity = 0;
        config.progress.interval_ms = 0;

        let errors = config.validate().unwrap_err();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["history.capacity", "progress.intervalMs"]);
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.engine.base_url = "not a url".to_string();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors[0].path, "engine.baseUrl");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"history": {"capacity": 5}, "logging": {"format": "json"}}"#)
                .unwrap();
        assert_eq!(config.history.capacity, 5);
        assert_eq!(config.history.path, None);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.progress.interval_ms, 1500);
    }

    #[test]
    fn test_history_path_override() {
        let mut config = Config::default();
        assert!(config.history_path().ends_with("forensight/history.json"));

        config.history.path = Some(PathBuf::from("/tmp/scans.json"));
        assert_eq!(config.history_path(), PathBuf::from("/tmp/scans.json"));
    }

    #[test]
    fn test_tick_interval() {
        let mut config = Config::default();
        config.progress.interval_ms = 250;
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
    }
}
