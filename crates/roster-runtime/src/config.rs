//! Runtime configuration.
//!
//! [`RosterConfig`] is built programmatically; `ROSTER_*` environment
//! variables can override the defaults:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `ROSTER_STORAGE_KEY` | `storage_key` | `crud-users` |
//! | `ROSTER_STATE_PATH` | `state_path` | unset (in-memory storage) |
//! | `ROSTER_NOTIFICATION_MS` | `notification_duration` | 5000 |
//! | `ROSTER_NOTIFICATION_CAPACITY` | `notification_capacity` | 32 |
//! | `ROSTER_PHONE_MIN_DIGITS` | `phone_min_digits` | 10 |

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use roster_core::constants::{NOTIFICATION_DURATION_MS, PHONE_MIN_DIGITS, USERS_STORAGE_KEY};

use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};

pub const ENV_STORAGE_KEY: &str = "ROSTER_STORAGE_KEY";
pub const ENV_STATE_PATH: &str = "ROSTER_STATE_PATH";
pub const ENV_NOTIFICATION_MS: &str = "ROSTER_NOTIFICATION_MS";
pub const ENV_NOTIFICATION_CAPACITY: &str = "ROSTER_NOTIFICATION_CAPACITY";
pub const ENV_PHONE_MIN_DIGITS: &str = "ROSTER_PHONE_MIN_DIGITS";

/// Default bound on queued notifications.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 32;

/// Settings shared by the store, the notification queue and the user form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterConfig {
    /// Slot holding the serialized user list.
    pub storage_key: String,
    /// File backing [`FileStorage`]; `None` keeps state in memory.
    pub state_path: Option<PathBuf>,
    /// Auto-dismiss delay for notifications.
    pub notification_duration: Duration,
    /// Maximum queued notifications; the oldest is evicted beyond this.
    pub notification_capacity: usize,
    /// Digit minimum for the form's phone rule.
    pub phone_min_digits: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            storage_key: USERS_STORAGE_KEY.to_string(),
            state_path: None,
            notification_duration: Duration::from_millis(NOTIFICATION_DURATION_MS),
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            phone_min_digits: PHONE_MIN_DIGITS,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct RosterConfigParse {
    pub config: RosterConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl RosterConfig {
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    #[must_use]
    pub fn with_state_path(mut self, path: impl AsRef<Path>) -> Self {
        self.state_path = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_notification_duration(mut self, duration: Duration) -> Self {
        self.notification_duration = duration;
        self
    }

    #[must_use]
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_phone_min_digits(mut self, digits: usize) -> Self {
        self.phone_min_digits = digits;
        self
    }

    /// Parse config from environment variables, dropping diagnostics.
    #[must_use]
    pub fn from_env() -> RosterConfig {
        let parsed = Self::from_env_with_diagnostics();
        for err in &parsed.errors {
            tracing::warn!(field = err.field, value = %err.value, "{}", err.message);
        }
        parsed.config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> RosterConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config from an arbitrary variable source.
    ///
    /// Unparsable values and values that fail [`Self::validate`] keep the
    /// default and are reported.
    pub fn from_env_with<F>(mut get: F) -> RosterConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = RosterConfig::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_STORAGE_KEY) {
            config.storage_key = value;
        }

        if let Some(value) = get(ENV_STATE_PATH) {
            if value.trim().is_empty() {
                errors.push(ConfigError::new("state_path", value, "expected a file path"));
            } else {
                config.state_path = Some(PathBuf::from(value));
            }
        }

        if let Some(value) = get(ENV_NOTIFICATION_MS) {
            match value.trim().parse::<u64>() {
                Ok(ms) => config.notification_duration = Duration::from_millis(ms),
                Err(_) => errors.push(ConfigError::new(
                    "notification_duration",
                    value,
                    "expected milliseconds",
                )),
            }
        }

        if let Some(value) = get(ENV_NOTIFICATION_CAPACITY) {
            match value.trim().parse::<usize>() {
                Ok(n) => config.notification_capacity = n,
                Err(_) => errors.push(ConfigError::new(
                    "notification_capacity",
                    value,
                    "expected integer",
                )),
            }
        }

        if let Some(value) = get(ENV_PHONE_MIN_DIGITS) {
            match value.trim().parse::<usize>() {
                Ok(n) => config.phone_min_digits = n,
                Err(_) => errors.push(ConfigError::new(
                    "phone_min_digits",
                    value,
                    "expected integer",
                )),
            }
        }

        if let Err(mut invalid) = config.validate() {
            config.reset_fields(&invalid);
            errors.append(&mut invalid);
        }

        RosterConfigParse { config, errors }
    }

    fn reset_fields(&mut self, invalid: &[ConfigError]) {
        let defaults = RosterConfig::default();
        for err in invalid {
            match err.field {
                "storage_key" => self.storage_key = defaults.storage_key.clone(),
                "notification_duration" => {
                    self.notification_duration = defaults.notification_duration;
                }
                "notification_capacity" => {
                    self.notification_capacity = defaults.notification_capacity;
                }
                "phone_min_digits" => self.phone_min_digits = defaults.phone_min_digits,
                _ => {}
            }
        }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.storage_key.trim().is_empty() {
            errors.push(ConfigError::new(
                "storage_key",
                self.storage_key.clone(),
                "must not be empty",
            ));
        }
        validate_positive("notification_capacity", self.notification_capacity, &mut errors);
        validate_positive("phone_min_digits", self.phone_min_digits, &mut errors);
        if self.notification_duration.is_zero() {
            errors.push(ConfigError::new(
                "notification_duration",
                "0",
                "must be >= 1ms",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Open the backend this config points at.
    #[must_use]
    pub fn open_storage(&self) -> Arc<dyn KeyValueStorage> {
        match &self.state_path {
            Some(path) => Arc::new(FileStorage::new(path)),
            None => Arc::new(MemoryStorage::new()),
        }
    }
}

fn validate_positive(field: &'static str, value: usize, errors: &mut Vec<ConfigError>) {
    if value == 0 {
        errors.push(ConfigError::new(field, value.to_string(), "must be >= 1"));
    }
}
