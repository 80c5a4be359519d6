//! The environment index interface and an in-memory implementation.

use super::error::EnvError;
use super::scope::SearchScope;
use std::collections::BTreeMap;

/// Maps environment names to declared variables, restricted by a search scope.
pub trait EnvironmentIndex: Send + Sync {
    /// Environment names declared by files visible in `scope`, sorted.
    fn environment_names(&self, scope: &SearchScope) -> Result<Vec<String>, EnvError>;

    /// Variable names declared for `environment` in `scope`, sorted.
    fn variable_names(&self, environment: &str, scope: &SearchScope)
        -> Result<Vec<String>, EnvError>;

    /// Value of `name` in `environment`, or `None` when it is not declared.
    fn lookup_value(
        &self,
        environment: &str,
        name: &str,
        scope: &SearchScope,
    ) -> Result<Option<String>, EnvError>;
}

/// Index backed by a plain map; ignores the search scope.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEnvironmentIndex {
    environments: BTreeMap<String, BTreeMap<String, String>>,
}

impl InMemoryEnvironmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name = value` in `environment`.
    pub fn with_variable(
        mut self,
        environment: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.environments
            .entry(environment.into())
            .or_default()
            .insert(name.into(), value.into());
        self
    }
}

impl EnvironmentIndex for InMemoryEnvironmentIndex {
    fn environment_names(&self, _scope: &SearchScope) -> Result<Vec<String>, EnvError> {
        Ok(self.environments.keys().cloned().collect())
    }

    fn variable_names(
        &self,
        environment: &str,
        _scope: &SearchScope,
    ) -> Result<Vec<String>, EnvError> {
        Ok(self
            .environments
            .get(environment)
            .map(|vars| vars.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn lookup_value(
        &self,
        environment: &str,
        name: &str,
        _scope: &SearchScope,
    ) -> Result<Option<String>, EnvError> {
        Ok(self
            .environments
            .get(environment)
            .and_then(|vars| vars.get(name))
            .cloned())
    }
}
