//! Dynamic variables: `{{$uuid}}`, `{{$timestamp}}`, `{{$randomInt 1 10}}`...
//!
//! Dynamic values are computed on every resolution. A few of them need to
//! know which project they run in (`{{$projectRoot}}`, `{{$dotenv NAME}}`)
//! and are registered as project-aware.

use crate::project::ProjectContext;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fmt;
use std::fs;
use thiserror::Error;
use uuid::Uuid;

/// Name of the dotenv file read by `{{$dotenv NAME}}`, relative to the project root.
pub const DOTENV_FILE: &str = ".env";

/// Why a dynamic variable could not produce a value.
///
/// These never reach the caller of the substitutor: they are logged and the
/// reference falls back to its default text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DynamicError {
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Dotenv error: {0}")]
    Dotenv(String),
}

/// Resolver that needs nothing but its arguments.
pub type PlainResolver = fn(&[&str]) -> Result<String, DynamicError>;

/// Resolver that also needs the project it runs in.
pub type ProjectResolver = fn(&ProjectContext, &[&str]) -> Result<String, DynamicError>;

/// One registry entry.
#[derive(Clone, Copy)]
pub enum DynamicVariable {
    Plain(PlainResolver),
    ProjectAware(ProjectResolver),
}

impl fmt::Debug for DynamicVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicVariable::Plain(_) => f.write_str("Plain"),
            DynamicVariable::ProjectAware(_) => f.write_str("ProjectAware"),
        }
    }
}

/// Catalog of dynamic variables, keyed by name (without the `$` sigil).
#[derive(Debug, Clone)]
pub struct DynamicRegistry {
    entries: HashMap<String, DynamicVariable>,
}

impl Default for DynamicRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DynamicRegistry {
    /// Registry with no entries.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry holding every built-in dynamic variable.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("uuid", DynamicVariable::Plain(resolve_uuid));
        registry.register("random.uuid", DynamicVariable::Plain(resolve_uuid));
        registry.register("guid", DynamicVariable::Plain(resolve_uuid));
        registry.register("timestamp", DynamicVariable::Plain(resolve_timestamp));
        registry.register("isoTimestamp", DynamicVariable::Plain(resolve_iso_timestamp));
        registry.register("datetime", DynamicVariable::Plain(resolve_datetime));
        registry.register("randomInt", DynamicVariable::Plain(resolve_random_int));
        registry.register("processEnv", DynamicVariable::Plain(resolve_process_env));
        registry.register(
            "projectRoot",
            DynamicVariable::ProjectAware(resolve_project_root),
        );
        registry.register("dotenv", DynamicVariable::ProjectAware(resolve_dotenv));
        registry
    }

    /// Adds or replaces an entry.
    pub fn register(&mut self, name: impl Into<String>, variable: DynamicVariable) {
        self.entries.insert(name.into(), variable);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether `name` must be resolved with a project context.
    pub fn is_project_aware(&self, name: &str) -> bool {
        matches!(
            self.entries.get(name),
            Some(DynamicVariable::ProjectAware(_))
        )
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Computes a plain dynamic variable. Project-aware and unknown names
    /// yield `None`, as do resolver failures.
    pub fn value(&self, name: &str, args: &[&str]) -> Option<String> {
        match self.entries.get(name)? {
            DynamicVariable::Plain(resolver) => absorb(name, resolver(args)),
            DynamicVariable::ProjectAware(_) => {
                log::debug!("Dynamic variable ${} needs a project context", name);
                None
            }
        }
    }

    /// Computes `name` for `project`. Plain entries ignore the project.
    pub fn project_value(
        &self,
        name: &str,
        args: &[&str],
        project: &ProjectContext,
    ) -> Option<String> {
        match self.entries.get(name)? {
            DynamicVariable::Plain(resolver) => absorb(name, resolver(args)),
            DynamicVariable::ProjectAware(resolver) => absorb(name, resolver(project, args)),
        }
    }
}

fn absorb(name: &str, result: Result<String, DynamicError>) -> Option<String> {
    result
        .map_err(|err| log::debug!("Dynamic variable ${} unresolved: {}", name, err))
        .ok()
}

/// Splits `randomInt 1 10` into its name and arguments.
pub fn split_invocation(text: &str) -> (&str, Vec<&str>) {
    let mut parts = text.split_whitespace();
    let name = parts.next().unwrap_or("");
    (name, parts.collect())
}

fn resolve_uuid(_args: &[&str]) -> Result<String, DynamicError> {
    Ok(Uuid::new_v4().to_string())
}

/// `{{$timestamp}}`, `{{$timestamp -1 d}}`: Unix seconds, optionally shifted.
fn resolve_timestamp(args: &[&str]) -> Result<String, DynamicError> {
    let now = Utc::now();
    if args.is_empty() {
        return Ok(now.timestamp().to_string());
    }
    Ok(parse_offset(now, args)?.timestamp().to_string())
}

fn resolve_iso_timestamp(_args: &[&str]) -> Result<String, DynamicError> {
    Ok(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// `{{$datetime rfc1123}}`, `{{$datetime iso8601 +2 h}}`.
fn resolve_datetime(args: &[&str]) -> Result<String, DynamicError> {
    let Some((format, offset)) = args.split_first() else {
        return Err(DynamicError::InvalidSyntax(
            "datetime requires format argument (rfc1123 or iso8601)".to_string(),
        ));
    };

    let now = Utc::now();
    let datetime = if offset.is_empty() {
        now
    } else {
        parse_offset(now, offset)?
    };

    match *format {
        "rfc1123" => Ok(datetime.to_rfc2822()),
        "iso8601" => Ok(datetime.to_rfc3339_opts(SecondsFormat::Millis, true)),
        other => Err(DynamicError::InvalidSyntax(format!(
            "Unknown datetime format: {}. Use 'rfc1123' or 'iso8601'",
            other
        ))),
    }
}

/// Offset given as `<signed number> <unit>`, unit one of `s`, `m`, `h`, `d`.
fn parse_offset(base: DateTime<Utc>, args: &[&str]) -> Result<DateTime<Utc>, DynamicError> {
    let [number, unit, ..] = args else {
        return Err(DynamicError::InvalidOffset(
            "Offset requires number and unit (e.g., '-1 d' or '+2 h')".to_string(),
        ));
    };

    let number: i64 = number
        .parse()
        .map_err(|_| DynamicError::InvalidOffset(format!("Invalid number: {}", number)))?;

    let duration = match *unit {
        "s" => Duration::try_seconds(number),
        "m" => Duration::try_minutes(number),
        "h" => Duration::try_hours(number),
        "d" => Duration::try_days(number),
        other => {
            return Err(DynamicError::InvalidOffset(format!(
                "Invalid unit: {}. Use 's', 'm', 'h', or 'd'",
                other
            )))
        }
    };

    duration
        .and_then(|duration| base.checked_add_signed(duration))
        .ok_or_else(|| {
            DynamicError::InvalidOffset(format!("Offset out of range: {} {}", number, unit))
        })
}

/// `{{$randomInt}}` picks from `0..1000`; `{{$randomInt min max}}` from `min..=max`.
fn resolve_random_int(args: &[&str]) -> Result<String, DynamicError> {
    let mut rng = rand::thread_rng();

    let (min, max) = match args {
        [] => return Ok(rng.gen_range(0..1000).to_string()),
        [min, max, ..] => (parse_bound(min)?, parse_bound(max)?),
        [_] => {
            return Err(DynamicError::InvalidSyntax(
                "randomInt requires both min and max arguments".to_string(),
            ))
        }
    };

    if min > max {
        return Err(DynamicError::InvalidSyntax(format!(
            "min ({}) cannot be greater than max ({})",
            min, max
        )));
    }

    Ok(rng.gen_range(min..=max).to_string())
}

fn parse_bound(text: &str) -> Result<i64, DynamicError> {
    text.parse()
        .map_err(|_| DynamicError::InvalidSyntax(format!("Invalid bound: {}", text)))
}

/// `{{$processEnv NAME}}` misses when unset; `{{$processEnv %NAME}}` yields "".
fn resolve_process_env(args: &[&str]) -> Result<String, DynamicError> {
    let Some(var_name) = args.first() else {
        return Err(DynamicError::InvalidSyntax(
            "processEnv requires variable name".to_string(),
        ));
    };

    let (optional, clean_name) = match var_name.strip_prefix('%') {
        Some(rest) => (true, rest),
        None => (false, *var_name),
    };

    match env::var(clean_name) {
        Ok(value) => Ok(value),
        Err(_) if optional => Ok(String::new()),
        Err(_) => Err(DynamicError::EnvVarNotFound(clean_name.to_string())),
    }
}

fn resolve_project_root(project: &ProjectContext, _args: &[&str]) -> Result<String, DynamicError> {
    Ok(project.root().display().to_string())
}

/// `{{$dotenv NAME}}` reads `.env` at the project root on every call.
fn resolve_dotenv(project: &ProjectContext, args: &[&str]) -> Result<String, DynamicError> {
    let Some(var_name) = args.first() else {
        return Err(DynamicError::InvalidSyntax(
            "dotenv requires variable name".to_string(),
        ));
    };

    let path = project.root().join(DOTENV_FILE);
    let content = fs::read_to_string(&path).map_err(|e| {
        DynamicError::Dotenv(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_dotenv(&content)
        .remove(*var_name)
        .ok_or_else(|| DynamicError::EnvVarNotFound(var_name.to_string()))
}

/// Parses `KEY=value` lines. Blank lines and `#` comments are skipped and
/// surrounding quotes are stripped from values.
pub fn parse_dotenv(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            log::warn!("Skipping invalid .env line {}: {}", line_num + 1, line);
            continue;
        };

        let value = value.trim();
        let unquoted = ['"', '\'']
            .iter()
            .find_map(|quote| {
                value
                    .strip_prefix(*quote)
                    .and_then(|rest| rest.strip_suffix(*quote))
            })
            .unwrap_or(value);

        vars.insert(key.trim().to_string(), unquoted.to_string());
    }

    vars
}
