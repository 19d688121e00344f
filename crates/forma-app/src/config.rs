//! Session configuration.
//!
//! Loaded from TOML, then overridden by `FORMA_*` environment variables.
//! Every field has a default, so an empty file is a valid configuration.

use forma_core::dates::{is_valid_pattern, DateFormats};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the log filter.
pub const ENV_LOG: &str = "FORMA_LOG";
/// Environment variable overriding the database date format.
pub const ENV_DATABASE_DATE_FORMAT: &str = "FORMA_DATABASE_DATE_FORMAT";
/// Environment variable overriding the UI date format.
pub const ENV_UI_DATE_FORMAT: &str = "FORMA_UI_DATE_FORMAT";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info,forma_app=debug`
    pub filter: String,
    /// Include the event target in output
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            with_target: true,
        }
    }
}

/// Top-level configuration for a form session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Date formats for storage and display
    pub dates: DateFormats,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl FormConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `FORMA_*` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply overrides from explicit key/value pairs.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            match key.as_ref() {
                ENV_LOG => self.logging.filter = value.into(),
                ENV_DATABASE_DATE_FORMAT => self.dates.database = value.into(),
                ENV_UI_DATE_FORMAT => self.dates.ui = value.into(),
                _ => {}
            }
        }
        self.validate()
    }

    /// Reject empty or malformed values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, pattern) in [
            ("dates.database", &self.dates.database),
            ("dates.ui", &self.dates.ui),
        ] {
            if !is_valid_pattern(pattern) {
                return Err(ConfigError::Invalid(format!(
                    "{name} is not a valid date pattern: {pattern:?}"
                )));
            }
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter is empty".to_string()));
        }
        Ok(())
    }
}
