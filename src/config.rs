//! Configuration System
//!
//! Layered configuration for the generation client: built-in defaults, the
//! global config file, workspace config files, then `COURSEGEN__*` environment
//! variables (for example `COURSEGEN__POLLING__MAX_CONSECUTIVE_FAILURES=5`).

use crate::error::CoreError;
use crate::logging::LoggingConfig;
use crate::poller::PollPolicy;
use crate::service::{HttpClientOptions, DEFAULT_API_BASE};
use config::Environment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge;
mod sources;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoursegenConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout; unset leaves requests unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: None,
        }
    }
}

impl ApiConfig {
    pub fn client_options(&self) -> HttpClientOptions {
        HttpClientOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err("request_timeout_ms must be positive when set".to_string());
        }
        Ok(())
    }
}

/// Job status polling policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_success_interval_ms")]
    pub success_interval_ms: u64,

    #[serde(default = "default_failure_interval_ms")]
    pub failure_interval_ms: u64,

    /// Give up after this many consecutive failed fetches; unset retries forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consecutive_failures: Option<u32>,

    /// Per-fetch deadline; unset waits for each fetch to settle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_ms: Option<u64>,
}

fn default_success_interval_ms() -> u64 {
    1200
}

fn default_failure_interval_ms() -> u64 {
    2000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            success_interval_ms: default_success_interval_ms(),
            failure_interval_ms: default_failure_interval_ms(),
            max_consecutive_failures: None,
            fetch_timeout_ms: None,
        }
    }
}

impl PollingConfig {
    pub fn to_policy(&self) -> PollPolicy {
        PollPolicy {
            success_interval: Duration::from_millis(self.success_interval_ms),
            failure_interval: Duration::from_millis(self.failure_interval_ms),
            max_consecutive_failures: self.max_consecutive_failures,
            fetch_timeout: self.fetch_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.success_interval_ms == 0 {
            return Err("success_interval_ms must be positive".to_string());
        }
        if self.failure_interval_ms <= self.success_interval_ms {
            return Err(format!(
                "failure_interval_ms ({}) must be greater than success_interval_ms ({})",
                self.failure_interval_ms, self.success_interval_ms
            ));
        }
        if self.max_consecutive_failures == Some(0) {
            return Err("max_consecutive_failures must be positive when set".to_string());
        }
        if self.fetch_timeout_ms == Some(0) {
            return Err("fetch_timeout_ms must be positive when set".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    Api(String),
    Polling(String),
    Logging(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::Api(msg) => write!(f, "api: {}", msg),
            ConfigValidationError::Polling(msg) => write!(f, "polling: {}", msg),
            ConfigValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

impl CoursegenConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.api.validate() {
            errors.push(ConfigValidationError::Api(e));
        }
        if let Err(e) = self.polling.validate() {
            errors.push(ConfigValidationError::Polling(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ConfigValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding all violations into one error.
    pub fn ensure_valid(&self) -> Result<(), CoreError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            CoreError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}

/// Loads [`CoursegenConfig`] from layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace files, then environment.
    pub fn load(workspace_root: &Path) -> Result<CoursegenConfig, CoreError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder
            .add_source(Self::environment())
            .build()?
            .try_deserialize::<CoursegenConfig>()?;
        Ok(config)
    }

    /// Defaults, the given file, then environment.
    pub fn load_from_file(path: &Path) -> Result<CoursegenConfig, CoreError> {
        if !path.exists() {
            return Err(CoreError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path).required(true))
            .add_source(Self::environment())
            .build()?
            .try_deserialize::<CoursegenConfig>()?;
        Ok(config)
    }

    pub fn xdg_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }

    fn environment() -> Environment {
        Environment::with_prefix("COURSEGEN")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }
}
