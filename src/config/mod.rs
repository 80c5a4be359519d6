//! Configuration management for the request runner.
//!
//! Settings are read from a JSON document under the `"rest-runner"` key,
//! merged with defaults, validated and kept in a process-wide instance.

pub mod schema;

pub use schema::{ConfigError, RunnerConfig};

use once_cell::sync::Lazy;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

/// Key holding runner settings inside a settings document.
pub const SETTINGS_KEY: &str = "rest-runner";

static CONFIG: Lazy<RwLock<RunnerConfig>> = Lazy::new(|| RwLock::new(RunnerConfig::default()));

/// Loads configuration from a settings document.
///
/// Settings that fail to deserialize or validate are an error and leave the
/// global configuration untouched. On success the global configuration is
/// replaced.
///
/// # Example
///
/// ```no_run
/// use rest_runner::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "rest-runner": {
///         "timeout": 60000,
///         "validateSsl": false
///     }
/// });
///
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.timeout, 60000);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<RunnerConfig, ConfigError> {
    let mut config = RunnerConfig::default();

    if let Some(settings) = settings_json.as_ref().and_then(|s| s.get(SETTINGS_KEY)) {
        let user_config = serde_json::from_value::<RunnerConfig>(settings.clone())
            .map_err(ConfigError::Settings)?;
        config = config.merge(&user_config);
    }

    config.validate()?;

    if let Ok(mut global_config) = CONFIG.write() {
        *global_config = config.clone();
    }

    Ok(config)
}

/// Reads a settings file and loads it with [`load_config`].
///
/// The file may hold the settings object directly or nest it under
/// `"rest-runner"`.
pub fn load_config_file(path: &Path) -> Result<RunnerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let settings = if value.get(SETTINGS_KEY).is_some() {
        value
    } else {
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(SETTINGS_KEY.to_string(), value);
        Value::Object(wrapper)
    };

    load_config(Some(settings)).map_err(|err| match err {
        ConfigError::Settings(source) => ConfigError::Json {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Current global configuration (defaults until something is loaded).
pub fn get_config() -> RunnerConfig {
    CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_else(|_| RunnerConfig::default())
}
