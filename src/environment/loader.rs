//! Environment files on disk and the index built from them.
//!
//! An environment file is a JSON object whose keys are environment names and
//! whose values are objects of variables:
//!
//! ```json
//! {
//!   "$shared": { "apiVersion": "v2" },
//!   "dev": { "host": "localhost:8080" },
//!   "billing:staging": { "host": "billing.staging.example.com" }
//! }
//! ```
//!
//! Private files (`http-client.private.env.json`) win over public ones for
//! the same environment and variable.

use super::error::EnvError;
use super::index::EnvironmentIndex;
use super::scope::SearchScope;
use crate::project::ProjectContext;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Public environment file name.
pub const PUBLIC_ENV_FILE: &str = "http-client.env.json";

/// Private environment file name; usually kept out of version control.
pub const PRIVATE_ENV_FILE: &str = "http-client.private.env.json";

/// Key holding variables shared by every environment in a file.
const SHARED_KEY: &str = "$shared";

/// Directories never descended into while scanning.
const IGNORED_DIRS: &[&str] = &["target", "node_modules"];

type VariableMap = BTreeMap<String, String>;

/// Contents of one environment file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentFile {
    pub path: PathBuf,
    pub private: bool,
    pub environments: BTreeMap<String, VariableMap>,
    pub shared: VariableMap,
}

impl EnvironmentFile {
    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self, EnvError> {
        let content = fs::read_to_string(path).map_err(|source| EnvError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| EnvError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut file = parse_environment_file(&raw)?;
        file.path = path.to_path_buf();
        file.private = is_private_file(path);
        Ok(file)
    }

    fn lookup(&self, environment: &str, name: &str) -> Option<&String> {
        self.environments.get(environment)?.get(name)
    }
}

/// Parses the JSON body of an environment file.
pub fn parse_environment_file(raw: &serde_json::Value) -> Result<EnvironmentFile, EnvError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| EnvError::InvalidFormat("Root must be a JSON object".to_string()))?;

    let mut file = EnvironmentFile::default();

    for (key, value) in obj {
        match key.as_str() {
            SHARED_KEY => file.shared = parse_variable_map(value, SHARED_KEY)?,
            "" => {
                return Err(EnvError::InvalidFormat(
                    "Environment name must not be empty".to_string(),
                ))
            }
            reserved if reserved.starts_with('$') => {
                log::debug!("Ignoring reserved environment key '{}'", reserved);
            }
            env_name => {
                let variables = parse_variable_map(value, env_name)?;
                file.environments.insert(env_name.to_string(), variables);
            }
        }
    }

    Ok(file)
}

/// Converts a JSON object into a string map. Scalars are stringified and
/// `null` becomes the empty string.
fn parse_variable_map(value: &serde_json::Value, context: &str) -> Result<VariableMap, EnvError> {
    let obj = value
        .as_object()
        .ok_or_else(|| EnvError::InvalidFormat(format!("'{}' must be a JSON object", context)))?;

    let mut map = VariableMap::new();
    for (key, val) in obj {
        let value_str = match val {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            _ => {
                return Err(EnvError::InvalidFormat(format!(
                    "Variable '{}' in '{}' has invalid type (must be string, number, or boolean)",
                    key, context
                )))
            }
        };
        map.insert(key.clone(), value_str);
    }

    Ok(map)
}

fn is_private_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.contains(".private."))
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with('.') || IGNORED_DIRS.contains(&name))
}

/// Index over environment files found on disk.
///
/// Built eagerly: files are read when added, and lookups only consult memory.
/// A file that fails to load is logged and left out.
#[derive(Debug, Clone)]
pub struct FileEnvironmentIndex {
    file_names: Vec<String>,
    files: Vec<EnvironmentFile>,
}

impl Default for FileEnvironmentIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FileEnvironmentIndex {
    /// Empty index recognising the default file names.
    pub fn new() -> Self {
        Self::with_file_names(vec![
            PUBLIC_ENV_FILE.to_string(),
            PRIVATE_ENV_FILE.to_string(),
        ])
    }

    /// Empty index recognising `file_names`.
    pub fn with_file_names(file_names: Vec<String>) -> Self {
        Self {
            file_names,
            files: Vec::new(),
        }
    }

    /// Index over the project tree and its scratch area.
    pub fn scan(project: &ProjectContext, file_names: Vec<String>) -> Self {
        let mut index = Self::with_file_names(file_names);
        index.scan_tree(project.root());
        if let Some(scratch) = project.scratch_root() {
            index.scan_tree(scratch);
        }
        index
    }

    /// Adds every recognised file below `root`. Hidden directories and build
    /// output are skipped.
    pub fn scan_tree(&mut self, root: &Path) {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_ignored_dir(entry));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => self.try_add(entry.path()),
                Ok(_) => {}
                Err(err) => log::warn!("Skipping unreadable path while scanning: {}", err),
            }
        }
    }

    /// Adds the recognised files directly inside `directory`.
    pub fn scan_directory(&mut self, directory: &Path) {
        let names = self.file_names.clone();
        for name in names {
            let candidate = directory.join(name);
            if candidate.is_file() {
                self.try_add(&candidate);
            }
        }
    }

    /// Loads one file into the index. Re-adding a known path is a no-op.
    pub fn add_file(&mut self, path: &Path) -> Result<(), EnvError> {
        if self.files.iter().any(|file| file.path == path) {
            return Ok(());
        }

        let file = EnvironmentFile::load(path)?;
        log::debug!(
            "Indexed {} environment(s) from {}",
            file.environments.len(),
            path.display()
        );
        self.files.push(file);
        Ok(())
    }

    pub fn files(&self) -> &[EnvironmentFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn try_add(&mut self, path: &Path) {
        let recognised = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| self.file_names.iter().any(|known| known == name));

        if recognised {
            if let Err(err) = self.add_file(path) {
                log::warn!("Ignoring environment file {}: {}", path.display(), err);
            }
        }
    }

    /// Files visible in `scope`, private ones first.
    fn visible<'a>(&'a self, scope: &'a SearchScope) -> impl Iterator<Item = &'a EnvironmentFile> {
        let private = self
            .files
            .iter()
            .filter(move |file| file.private && scope.contains(&file.path));
        let public = self
            .files
            .iter()
            .filter(move |file| !file.private && scope.contains(&file.path));
        private.chain(public)
    }
}

impl EnvironmentIndex for FileEnvironmentIndex {
    fn environment_names(&self, scope: &SearchScope) -> Result<Vec<String>, EnvError> {
        let names: BTreeSet<&String> = self
            .visible(scope)
            .flat_map(|file| file.environments.keys())
            .collect();
        Ok(names.into_iter().cloned().collect())
    }

    fn variable_names(
        &self,
        environment: &str,
        scope: &SearchScope,
    ) -> Result<Vec<String>, EnvError> {
        let names: BTreeSet<&String> = self
            .visible(scope)
            .filter_map(|file| file.environments.get(environment))
            .flat_map(|vars| vars.keys())
            .collect();
        Ok(names.into_iter().cloned().collect())
    }

    fn lookup_value(
        &self,
        environment: &str,
        name: &str,
        scope: &SearchScope,
    ) -> Result<Option<String>, EnvError> {
        if let Some(value) = self
            .visible(scope)
            .find_map(|file| file.lookup(environment, name))
        {
            return Ok(Some(value.clone()));
        }

        // Shared values only apply to environments the scope knows about.
        let declared = self
            .visible(scope)
            .any(|file| file.environments.contains_key(environment));
        if !declared {
            return Ok(None);
        }

        Ok(self
            .visible(scope)
            .find_map(|file| file.shared.get(name))
            .cloned())
    }
}
