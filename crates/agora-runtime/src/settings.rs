//! # Environment-Based Configuration
//!
//! Runtime tuning is read from the environment so deployments can change it
//! without rebuilds.
//!
//! - `AGORA_STEP_TIMEOUT_SECS` - Completion call timeout (default: 68)
//! - `AGORA_TOOL_TIMEOUT_SECS` - Timeout for peer delivery and custom tools (default: 7200)
//! - `AGORA_READINESS_POLL_INTERVAL_MS` - Backoff between peer status checks (default: 1000)
//! - `AGORA_READINESS_MAX_POLLS` - Status checks before a cold peer is given up on (default: 60)
//! - `AGORA_REMINDER_MAX_ATTEMPTS` - Reminder signal attempts (default: 3)
//! - `AGORA_REMINDER_RETRY_BACKOFF_MS` - Backoff between reminder attempts (default: 1000)
//! - `AGORA_STATE_DIR` - Directory for actor state and reminders (default: `agora_state`)
//! - `AGORA_CONFIG_DIR` - Directory for persisted actor configs (default: `agent_configs`)

use agora_core::error::ConfigError;
use agora_mesh::DirectoryConfig;
use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub step_timeout: Duration,
    pub tool_timeout: Duration,
    pub readiness_poll_interval: Duration,
    pub readiness_max_polls: u32,
    pub reminder_max_attempts: u32,
    pub reminder_retry_backoff: Duration,
    pub state_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(68),
            tool_timeout: Duration::from_secs(2 * 60 * 60),
            readiness_poll_interval: Duration::from_secs(1),
            readiness_max_polls: 60,
            reminder_max_attempts: 3,
            reminder_retry_backoff: Duration::from_secs(1),
            state_dir: PathBuf::from("agora_state"),
            config_dir: PathBuf::from("agent_configs"),
        }
    }
}

impl RuntimeSettings {
    pub fn builder() -> RuntimeSettingsBuilder {
        RuntimeSettingsBuilder::default()
    }

    /// Load settings from `AGORA_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value or the
    /// resulting settings fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Some(secs) = get_env_u64("AGORA_STEP_TIMEOUT_SECS")? {
            builder = builder.step_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = get_env_u64("AGORA_TOOL_TIMEOUT_SECS")? {
            builder = builder.tool_timeout(Duration::from_secs(secs));
        }
        if let Some(ms) = get_env_u64("AGORA_READINESS_POLL_INTERVAL_MS")? {
            builder = builder.readiness_poll_interval(Duration::from_millis(ms));
        }
        if let Some(polls) = get_env_u32("AGORA_READINESS_MAX_POLLS")? {
            builder = builder.readiness_max_polls(polls);
        }
        if let Some(attempts) = get_env_u32("AGORA_REMINDER_MAX_ATTEMPTS")? {
            builder = builder.reminder_max_attempts(attempts);
        }
        if let Some(ms) = get_env_u64("AGORA_REMINDER_RETRY_BACKOFF_MS")? {
            builder = builder.reminder_retry_backoff(Duration::from_millis(ms));
        }
        if let Some(dir) = get_env_string("AGORA_STATE_DIR") {
            builder = builder.state_dir(dir);
        }
        if let Some(dir) = get_env_string("AGORA_CONFIG_DIR") {
            builder = builder.config_dir(dir);
        }

        builder.build()
    }

    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig {
            poll_interval: self.readiness_poll_interval,
            max_polls: self.readiness_max_polls,
        }
    }
}

/// Builder for [`RuntimeSettings`]
#[derive(Debug, Clone, Default)]
pub struct RuntimeSettingsBuilder {
    settings: RuntimeSettings,
}

impl RuntimeSettingsBuilder {
    #[must_use]
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.settings.step_timeout = timeout;
        self
    }

    #[must_use]
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.settings.tool_timeout = timeout;
        self
    }

    #[must_use]
    pub fn readiness_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.readiness_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn readiness_max_polls(mut self, polls: u32) -> Self {
        self.settings.readiness_max_polls = polls;
        self
    }

    #[must_use]
    pub fn reminder_max_attempts(mut self, attempts: u32) -> Self {
        self.settings.reminder_max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn reminder_retry_backoff(mut self, backoff: Duration) -> Self {
        self.settings.reminder_retry_backoff = backoff;
        self
    }

    #[must_use]
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.state_dir = dir.into();
        self
    }

    #[must_use]
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.config_dir = dir.into();
        self
    }

    /// Validate and build
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if a value is out of range.
    pub fn build(self) -> Result<RuntimeSettings, ConfigError> {
        let s = &self.settings;
        if s.step_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "step_timeout must be greater than 0".to_string(),
            ));
        }
        if s.tool_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "tool_timeout must be greater than 0".to_string(),
            ));
        }
        if s.readiness_max_polls == 0 {
            return Err(ConfigError::ValidationError(
                "readiness_max_polls must be at least 1".to_string(),
            ));
        }
        if s.reminder_max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "reminder_max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(self.settings)
    }
}

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_u32(key: &str) -> Result<Option<u32>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u32>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u32 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
