//! Environments: named sets of variables declared in environment files.
//!
//! An [`EnvironmentIndex`] knows which environments exist and what they
//! declare. An [`Environment`] is the read-only view a substitutor consults:
//! the selected environment names plus the search scope of the request file.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use rest_runner::environment::{Environment, FileEnvironmentIndex};
//! use rest_runner::project::ProjectContext;
//!
//! let project = ProjectContext::new("/path/to/project");
//! let index = FileEnvironmentIndex::scan(&project, vec!["http-client.env.json".into()]);
//!
//! let file = Path::new("/path/to/project/api/users.http");
//! let env = Environment::for_file(Arc::new(index), &project, Some(file), vec!["api:dev".into()]);
//! if let Some(host) = env.get_variable_value("host") {
//!     println!("host = {}", host);
//! }
//! ```

pub mod error;
pub mod index;
pub mod loader;
pub mod scope;

use crate::project::ProjectContext;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use error::EnvError;
pub use index::{EnvironmentIndex, InMemoryEnvironmentIndex};
pub use loader::{FileEnvironmentIndex, PRIVATE_ENV_FILE, PUBLIC_ENV_FILE};
pub use scope::{environment_prefix, SearchScope};

/// Selected environments for one request file.
///
/// Lookups walk the selected names in order; the first hit wins. Index
/// failures are logged and count as misses.
#[derive(Clone)]
pub struct Environment {
    names: Vec<String>,
    scope: SearchScope,
    index: Option<Arc<dyn EnvironmentIndex>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names)
            .field("scope", &self.scope)
            .field("has_index", &self.index.is_some())
            .finish()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::empty()
    }
}

impl Environment {
    /// No environment selected; every lookup misses.
    pub fn empty() -> Self {
        Self {
            names: Vec::new(),
            scope: SearchScope::Directory(PathBuf::new()),
            index: None,
        }
    }

    /// Environment over `names`, looked up in order within `scope`.
    ///
    /// # Arguments
    ///
    /// * `index` - Where environment values come from
    /// * `scope` - Search boundary for this request file
    /// * `names` - Selected environments; the first one defining a variable wins
    pub fn new(index: Arc<dyn EnvironmentIndex>, scope: SearchScope, names: Vec<String>) -> Self {
        Self {
            names,
            scope,
            index: Some(index),
        }
    }

    /// Selects `names` with the scope that applies to `file`.
    pub fn for_file(
        index: Arc<dyn EnvironmentIndex>,
        project: &ProjectContext,
        file: Option<&Path>,
        names: Vec<String>,
    ) -> Self {
        Self::new(index, SearchScope::for_file(project, file), names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn scope(&self) -> &SearchScope {
        &self.scope
    }

    /// First value of `name` across the selected environments.
    pub fn get_variable_value(&self, name: &str) -> Option<String> {
        let index = self.index.as_ref()?;

        self.names.iter().find_map(|environment| {
            match index.lookup_value(environment, name, &self.scope) {
                Ok(value) => value,
                Err(err) => {
                    log::warn!(
                        "Environment lookup of '{}' in '{}' failed: {}",
                        name,
                        environment,
                        err
                    );
                    None
                }
            }
        })
    }

    /// Union of variable names declared by the selected environments.
    pub fn variable_names(&self) -> Vec<String> {
        let Some(index) = self.index.as_ref() else {
            return Vec::new();
        };

        let mut names: Vec<String> = self
            .names
            .iter()
            .flat_map(|environment| {
                index
                    .variable_names(environment, &self.scope)
                    .unwrap_or_else(|err| {
                        log::warn!("Listing variables of '{}' failed: {}", environment, err);
                        Vec::new()
                    })
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Environment names a request file may select.
///
/// Inside the project, a file under a top-level directory `P` only sees
/// environments named `P:<something>`.
pub fn available_environments(
    index: &dyn EnvironmentIndex,
    project: &ProjectContext,
    file: Option<&Path>,
) -> Result<Vec<String>, EnvError> {
    let scope = SearchScope::for_file(project, file);
    let names = index.environment_names(&scope)?;

    let prefix = file.and_then(|file| environment_prefix(project, file));
    Ok(match prefix {
        Some(prefix) => names
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .collect(),
        None => names,
    })
}
