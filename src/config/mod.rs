//! Configuration loading
//!
//! Reads a JSON5 file (comments and trailing commas allowed), fills every
//! missing value with its default, applies environment overrides and
//! validates the result. A missing file is not an error.
//!
//! Resolution order for the file path:
//! 1. `FORENSIGHT_CONFIG_PATH`
//! 2. `<config_dir>/forensight/config.json5`
//!
//! The engine API key can come from `GEMINI_API_KEY` or `API_KEY`; the
//! environment wins over the file.

pub mod types;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use types::{
    default_history_path, Config, EngineConfig, HistoryConfig, LogFormat, LoggingConfig,
    ProgressConfig, ValidationError,
};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "FORENSIGHT_CONFIG_PATH";

/// Environment variables checked, in order, for the engine API key.
pub const API_KEY_ENVS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {}", format_validation(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolve the configuration file path.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("forensight")
        .join("config.json5")
}

/// Load, override from the environment, and validate.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = get_config_path();
    let mut config = load_config_uncached(&path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Parse a config file without environment overrides or validation.
pub fn load_config_uncached(path: &Path) -> Result<Config, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    if raw.trim().is_empty() {
        return Ok(Config::default());
    }

    json5::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let key = API_KEY_ENVS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty());
    if let Some(key) = key {
        config.engine.api_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config_uncached(Path::new("/nonexistent/forensight.json5")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parses_json5() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json5");
        std::fs::write(
            &path,
            r#"{
                // keep a short history
                history: { capacity: 5, path: "/tmp/scans.json" },
                progress: { intervalMs: 500 },
                engine: { model: "gemini-test", },
            }"#,
        )
        .unwrap();

        let config = load_config_uncached(&path).unwrap();
        assert_eq!(config.history.capacity, 5);
        assert_eq!(config.history.path, Some(PathBuf::from("/tmp/scans.json")));
        assert_eq!(config.progress.interval_ms, 500);
        assert_eq!(config.engine.model, "gemini-test");
        assert_eq!(config.engine.thinking_budget, 4096);
    }

    #[test]
    fn test_parse_error_names_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json5");
        std::fs::write(&path, "{ history: ").unwrap();

        let err = load_config_uncached(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.json5"));
    }

    #[test]
    fn test_env_overrides_api_key() {
        let env: HashMap<&str, &str> = [("API_KEY", "from-api-key")].into_iter().collect();
        let mut config = Config::default();
        config.engine.api_key = Some("from-file".to_string());

        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.engine.api_key.as_deref(), Some("from-api-key"));
    }

    #[test]
    fn test_env_prefers_gemini_key() {
        let env: HashMap<&str, &str> = [("API_KEY", "generic"), ("GEMINI_API_KEY", "specific")]
            .into_iter()
            .collect();
        let mut config = Config::default();

        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.engine.api_key.as_deref(), Some("specific"));
    }

    #[test]
    fn test_env_blank_key_ignored() {
        let mut config = Config::default();
        config.engine.api_key = Some("from-file".to_string());

        apply_env_overrides(&mut config, |k| {
            (k == "GEMINI_API_KEY").then(|| "  ".to_string())
        });
        assert_eq!(config.engine.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_invalid_error_lists_paths() {
        let err = ConfigError::Invalid(vec![ValidationError {
            path: "history.capacity".to_string(),
            message: "must keep at least one record".to_string(),
        }]);
        assert!(err.to_string().contains("history.capacity"));
    }
}
