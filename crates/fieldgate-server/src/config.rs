//! Configuration management for the fieldgate resolution layer.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use fieldgate_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("fieldgate.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use fieldgate_domain::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use fieldgate_domain::PageLimits;
use serde::{Deserialize, Serialize};

use crate::errors::ErrorConfig;
use crate::observability::LoggingConfig;

const ENV_PREFIX: &str = "FIELDGATE";

/// Resolution layer configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub pagination: PaginationSettings,

    #[serde(default)]
    pub loader: LoaderSettings,

    #[serde(default)]
    pub request: RequestSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub errors: ErrorSettings,
}

/// Page size bounds for cursor-paginated lists.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PaginationSettings {
    /// Page size used when `first` is unset or zero.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Largest accepted `first`. Larger requests are rejected.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> usize {
    MAX_PAGE_SIZE
}

/// Batching loader settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoaderSettings {
    /// Keys sent per downstream fetch. Larger windows are split.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_max_batch_size() -> usize {
    fieldgate_domain::loader::DEFAULT_MAX_BATCH_SIZE
}

/// Per-request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RequestSettings {
    /// Deadline for resolving one query, in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Client-facing error detail.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ErrorSettings {
    /// Expose internal error messages to clients. Development only.
    #[serde(default)]
    pub detailed: bool,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `FIELDGATE_` and use `__` as
    /// separator. For example:
    /// - `FIELDGATE_PAGINATION__MAX_PAGE_SIZE=100` overrides `pagination.max_page_size`
    /// - `FIELDGATE_REQUEST__TIMEOUT_SECS=5` overrides `request.timeout_secs`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let pagination = &self.pagination;
        if pagination.default_page_size == 0 {
            return Err(invalid("pagination.default_page_size must be greater than 0"));
        }
        if pagination.max_page_size == 0 {
            return Err(invalid("pagination.max_page_size must be greater than 0"));
        }
        if pagination.default_page_size > pagination.max_page_size {
            return Err(invalid(format!(
                "pagination.default_page_size ({}) must not exceed pagination.max_page_size ({})",
                pagination.default_page_size, pagination.max_page_size
            )));
        }

        if self.loader.max_batch_size == 0 {
            return Err(invalid("loader.max_batch_size must be greater than 0"));
        }

        if self.request.timeout_secs == 0 {
            return Err(invalid("request.timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.pagination.default_page_size,
            max_page_size: self.pagination.max_page_size,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request.timeout_secs)
    }

    pub fn error_config(&self) -> ErrorConfig {
        ErrorConfig {
            detailed_errors: self.errors.detailed,
        }
    }

    /// Logging setup derived from the `logging` section.
    pub fn logging_config(&self) -> LoggingConfig {
        let level = tracing::Level::from_str(&self.logging.level).unwrap_or(tracing::Level::INFO);
        let base = if self.logging.json {
            LoggingConfig::json()
        } else {
            LoggingConfig::text()
        };
        base.with_level(level)
    }
}

fn env_source() -> Environment {
    // FIELDGATE_LOADER__MAX_BATCH_SIZE -> loader.max_batch_size
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
pagination:
  default_page_size: 20
  max_page_size: 50

loader:
  max_batch_size: 25

request:
  timeout_secs: 5

logging:
  level: debug
  json: true

errors:
  detailed: true
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.pagination.default_page_size, 20);
        assert_eq!(config.pagination.max_page_size, 50);
        assert_eq!(config.loader.max_batch_size, 25);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.error_config().detailed_errors);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
pagination:
  default_page_size: 20
  max_page_size: 50
"#
        )
        .unwrap();

        std::env::set_var("FIELDGATE_PAGINATION__MAX_PAGE_SIZE", "80");
        std::env::set_var("FIELDGATE_LOGGING__LEVEL", "warn");

        let config = ServerConfig::load(file.path());

        std::env::remove_var("FIELDGATE_PAGINATION__MAX_PAGE_SIZE");
        std::env::remove_var("FIELDGATE_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.pagination.max_page_size, 80); // Overridden by env
        assert_eq!(config.pagination.default_page_size, 20); // From file
        assert_eq!(config.logging.level, "warn");
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let cases: [(fn(&mut ServerConfig), &str); 5] = [
            (
                |c| c.pagination.default_page_size = 0,
                "pagination.default_page_size",
            ),
            (|c| c.pagination.max_page_size = 0, "pagination.max_page_size"),
            (
                |c| {
                    c.pagination.default_page_size = 300;
                    c.pagination.max_page_size = 200;
                },
                "must not exceed",
            ),
            (|c| c.loader.max_batch_size = 0, "loader.max_batch_size"),
            (|c| c.logging.level = "verbose".to_string(), "logging.level"),
        ];

        for (mutate, expected) in cases {
            let mut config = ServerConfig::default();
            mutate(&mut config);
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "expected '{expected}' in: {err}"
            );
        }

        let mut config = ServerConfig::default();
        config.request.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = ServerConfig::load("/nonexistent/path/fieldgate.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();

        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.page_limits(), PageLimits::default());
        assert_eq!(config.pagination.default_page_size, 60);
        assert_eq!(config.pagination.max_page_size, 200);
        assert_eq!(config.loader.max_batch_size, 100);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.error_config().detailed_errors);
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("FIELDGATE_REQUEST__TIMEOUT_SECS", "3");

        let config = ServerConfig::from_env();

        std::env::remove_var("FIELDGATE_REQUEST__TIMEOUT_SECS");

        let config = config.unwrap();
        assert_eq!(config.request.timeout_secs, 3);
        assert_eq!(config.pagination.max_page_size, 200); // default
    }

    #[test]
    fn test_logging_config_follows_settings() {
        let mut config = ServerConfig::default();
        config.logging.level = "debug".to_string();
        config.logging.json = true;

        let logging = config.logging_config();
        assert!(logging.json_format);
        assert_eq!(logging.default_level, tracing::Level::DEBUG);
    }
}
