//! Alert configuration: TOML file first, then environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use truck_alert_incident_models::AlertChannel;

/// Hourly cap shared by the two email channels.
pub const DEFAULT_EMAIL_MAX_PER_HOUR: u64 = 20;

/// Hourly cap shared by the two SMS channels.
pub const DEFAULT_SMS_MAX_PER_HOUR: u64 = 10;

/// Longest SMS body, in characters.
pub const DEFAULT_SMS_MAX_CHARS: usize = 160;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AlertConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable holds a value of the wrong shape.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// The rejected value.
        value: String,
    },
}

fn default_email_max() -> u64 {
    DEFAULT_EMAIL_MAX_PER_HOUR
}

fn default_sms_max() -> u64 {
    DEFAULT_SMS_MAX_PER_HOUR
}

fn default_sms_chars() -> usize {
    DEFAULT_SMS_MAX_CHARS
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/truck_alert.db")
}

fn default_region() -> String {
    "Houston".to_string()
}

const fn default_include_stalls() -> bool {
    true
}

/// Runtime configuration for storage and alerting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AlertConfig {
    /// Cap on email and hazmat-email alerts per rolling hour.
    #[serde(default = "default_email_max")]
    pub email_max_per_hour: u64,
    /// Cap on SMS and hazmat-SMS alerts per rolling hour.
    #[serde(default = "default_sms_max")]
    pub sms_max_per_hour: u64,
    /// SMS length budget in characters.
    #[serde(default = "default_sms_chars")]
    pub sms_max_chars: usize,
    /// Recipient of the daily CSV summary.
    #[serde(default)]
    pub summary_recipient: Option<String>,
    /// `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Region name used in message text.
    #[serde(default = "default_region")]
    pub region: String,
    /// Initial stall setting, used only when the store has none yet.
    #[serde(default = "default_include_stalls")]
    pub include_stalls: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            email_max_per_hour: default_email_max(),
            sms_max_per_hour: default_sms_max(),
            sms_max_chars: default_sms_chars(),
            summary_recipient: None,
            database_path: default_database_path(),
            region: default_region(),
            include_stalls: default_include_stalls(),
        }
    }
}

impl AlertConfig {
    /// Hourly cap that applies to `channel`.
    #[must_use]
    pub const fn max_per_hour(&self, channel: AlertChannel) -> u64 {
        if channel.is_per_recipient() {
            self.sms_max_per_hour
        } else {
            self.email_max_per_hour
        }
    }

    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads the optional config file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment override is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Applies overrides from `MAX_ALERTS_PER_HOUR`,
    /// `SMS_MAX_ALERTS_PER_HOUR`, `DAILY_SUMMARY_EMAIL`, `TRUCK_ALERT_DB`,
    /// and `INCLUDE_STALLS`, looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric or boolean
    /// variable does not parse.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("MAX_ALERTS_PER_HOUR") {
            self.email_max_per_hour = parse_env("MAX_ALERTS_PER_HOUR", &value)?;
        }

        if let Some(value) = lookup("SMS_MAX_ALERTS_PER_HOUR") {
            self.sms_max_per_hour = parse_env("SMS_MAX_ALERTS_PER_HOUR", &value)?;
        }

        if let Some(value) = lookup("DAILY_SUMMARY_EMAIL") {
            let value = value.trim();
            self.summary_recipient = (!value.is_empty()).then(|| value.to_string());
        }

        if let Some(value) = lookup("TRUCK_ALERT_DB") {
            self.database_path = PathBuf::from(value);
        }

        if let Some(value) = lookup("INCLUDE_STALLS") {
            self.include_stalls = parse_bool("INCLUDE_STALLS", &value)?;
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
