//! Transport settings derived from the runner configuration.

use crate::config::{get_config, RunnerConfig};
use std::collections::BTreeMap;
use std::time::Duration;

/// Settings the HTTP transport is built with.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub validate_ssl: bool,
    /// Added to a request unless it already carries a header of that name.
    pub default_headers: BTreeMap<String, String>,
}

impl ExecutionConfig {
    /// Defaults with the given per-request `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::from_config(&RunnerConfig::default())
        }
    }

    /// Execution settings derived from runner settings.
    ///
    /// # Arguments
    ///
    /// * `config` - Source of the timeout, redirect, SSL and default header settings
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            timeout: config.timeout_duration(),
            follow_redirects: config.follow_redirects,
            max_redirects: config.max_redirects,
            validate_ssl: config.validate_ssl,
            default_headers: config.default_headers.clone(),
        }
    }

    /// Built from the global configuration.
    pub fn from_global_config() -> Self {
        Self::from_config(&get_config())
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::from_global_config()
    }
}
