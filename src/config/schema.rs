//! Configuration schema for the request runner.
//!
//! All settings live under the `"rest-runner"` key of a settings file.
//! Missing settings fall back to the defaults below.

use crate::environment::{PRIVATE_ENV_FILE, PUBLIC_ENV_FILE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Reasons a configuration is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("timeout must be greater than 0")]
    ZeroTimeout,

    #[error("batchTimeout must be greater than 0 when set")]
    ZeroBatchTimeout,

    #[error("preRequestScript must be a bare file name, got '{0}'")]
    InvalidScriptName(String),

    #[error("environmentFiles must name at least one file")]
    NoEnvironmentFiles,

    #[error("logLevel '{0}' is not one of off, error, warn, info, debug, trace")]
    InvalidLogLevel(String),

    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rest-runner settings: {0}")]
    Settings(#[source] serde_json::Error),

    #[error("Settings file {path} is invalid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Runner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Per-request timeout in milliseconds. Must be greater than 0.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Only used when `follow_redirects` is true.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Whether to validate TLS certificates.
    #[serde(default = "default_validate_ssl", alias = "validateSSL")]
    pub validate_ssl: bool,

    /// File name searched for in the ancestors of each request file.
    #[serde(default = "default_pre_request_script")]
    pub pre_request_script: String,

    /// Environment file names recognised while scanning the project.
    #[serde(default = "default_environment_files")]
    pub environment_files: Vec<String>,

    /// Scratch area; request files under it are treated as throwaway buffers.
    #[serde(default)]
    pub scratch_directory: Option<PathBuf>,

    /// Deadline for a whole batch in milliseconds. Unset means no deadline.
    #[serde(default)]
    pub batch_timeout: Option<u64>,

    /// Headers added to every request unless the request sets them itself.
    #[serde(default = "default_headers")]
    pub default_headers: BTreeMap<String, String>,

    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            validate_ssl: default_validate_ssl(),
            pre_request_script: default_pre_request_script(),
            environment_files: default_environment_files(),
            scratch_directory: None,
            batch_timeout: None,
            default_headers: default_headers(),
            log_level: default_log_level(),
        }
    }
}

impl RunnerConfig {
    /// Checks every setting; returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.batch_timeout == Some(0) {
            return Err(ConfigError::ZeroBatchTimeout);
        }

        let script = self.pre_request_script.trim();
        if script.is_empty() || script.contains('/') || script.contains('\\') {
            return Err(ConfigError::InvalidScriptName(
                self.pre_request_script.clone(),
            ));
        }

        if self.environment_files.is_empty() {
            return Err(ConfigError::NoEnvironmentFiles);
        }

        if log::LevelFilter::from_str(&self.log_level).is_err() {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        Ok(())
    }

    /// Per-request timeout as a [`Duration`].
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn batch_timeout_duration(&self) -> Option<Duration> {
        self.batch_timeout.map(Duration::from_millis)
    }

    /// Applies `other` on top of `self`; every field of `other` wins.
    pub fn merge(&self, other: &RunnerConfig) -> Self {
        Self {
            timeout: other.timeout,
            follow_redirects: other.follow_redirects,
            max_redirects: other.max_redirects,
            validate_ssl: other.validate_ssl,
            pre_request_script: other.pre_request_script.clone(),
            environment_files: other.environment_files.clone(),
            scratch_directory: other
                .scratch_directory
                .clone()
                .or_else(|| self.scratch_directory.clone()),
            batch_timeout: other.batch_timeout.or(self.batch_timeout),
            default_headers: other.default_headers.clone(),
            log_level: other.log_level.clone(),
        }
    }
}

fn default_timeout() -> u64 {
    30000
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> u32 {
    10
}

fn default_validate_ssl() -> bool {
    true
}

fn default_pre_request_script() -> String {
    "pre-request-script.js".to_string()
}

fn default_environment_files() -> Vec<String> {
    vec![PUBLIC_ENV_FILE.to_string(), PRIVATE_ENV_FILE.to_string()]
}

fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(
        "User-Agent".to_string(),
        format!("rest-runner/{}", env!("CARGO_PKG_VERSION")),
    );
    headers
}

fn default_log_level() -> String {
    "info".to_string()
}
