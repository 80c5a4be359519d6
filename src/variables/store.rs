//! Mutable variable maps: per-run transient variables and the project-wide
//! global context.
//!
//! Both are cheap to clone and every clone shares the same underlying map, so
//! a value written by a pre-request script is visible to the very next
//! resolution. Access goes through an `RwLock`: one writer at a time, any
//! number of readers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Errors raised while loading or saving a global context file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid global context file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Global context has no backing file")]
    NoBackingFile,
}

/// A shared name → value map.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `values`.
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(values)),
        }
    }

    /// Value for `name`. An explicitly stored empty string is `Some("")`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Sets `name`, replacing any earlier value. An empty value is kept.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    /// Removes `name`, returning its previous value.
    pub fn remove(&self, name: &str) -> Option<String> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Removes every variable.
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// On-disk layout of a global context file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct GlobalContextFile {
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

/// Project-wide variables that outlive a single run.
///
/// One instance per project; clone it to hand it to several substitutors.
/// Optionally backed by a JSON file written by [`GlobalContext::save`].
#[derive(Debug, Clone, Default)]
pub struct GlobalContext {
    store: VariableStore,
    path: Option<PathBuf>,
}

impl GlobalContext {
    /// In-memory context with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the context from `path`. A missing file yields an empty context
    /// that will be created on the first save.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let variables = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                serde_json::from_str::<GlobalContextFile>(&content)
                    .map_err(|source| StoreError::Parse {
                        path: path.clone(),
                        source,
                    })?
                    .variables
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        log::debug!(
            "Loaded {} global variable(s) from {}",
            variables.len(),
            path.display()
        );

        Ok(Self {
            store: VariableStore::from_map(variables),
            path: Some(path),
        })
    }

    /// Writes the current contents to the backing file.
    pub fn save(&self) -> Result<(), StoreError> {
        let path = self.path.as_ref().ok_or(StoreError::NoBackingFile)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = GlobalContextFile {
            variables: self.store.snapshot(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }

    /// Backing file, if this context persists.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Value of `name`, if set.
    pub fn get_value(&self, name: &str) -> Option<String> {
        self.store.get(name)
    }

    /// Sets `name`; the change is written on the next [`save`](GlobalContext::save).
    pub fn set_value(&self, name: impl Into<String>, value: impl Into<String>) {
        self.store.set(name, value);
    }

    pub fn remove_value(&self, name: &str) -> Option<String> {
        self.store.remove(name)
    }

    /// The underlying store, as exposed to scripts under `global`.
    pub fn variables(&self) -> &VariableStore {
        &self.store
    }
}
