//! The variable scope chain.
//!
//! A [`VariableSubstitutor`] answers "what is the value of this name?" for one
//! run. Resolution order:
//!
//! 1. `$name` → dynamic registry only (project-aware entries get the project)
//! 2. transient variables of this run
//! 3. global context of the project
//! 4. selected environment(s)
//! 5. the reference's default text
//!
//! A miss is never an error: the caller gets the default, or `None`.

use super::dynamic::{split_invocation, DynamicRegistry};
use super::store::{GlobalContext, VariableStore};
use crate::environment::Environment;
use crate::project::ProjectContext;
use crate::template::{render_all, TemplateNode, VariableKind, VariableReference, DYNAMIC_SIGIL};
use std::sync::Arc;

/// Resolves variable names through the scope chain.
///
/// Clones share the transient variables, so every request in a batch sees
/// what an earlier script stored.
#[derive(Debug, Clone)]
pub struct VariableSubstitutor {
    environment: Environment,
    global: GlobalContext,
    variables: VariableStore,
    dynamic: Arc<DynamicRegistry>,
    project: Option<ProjectContext>,
}

impl Default for VariableSubstitutor {
    fn default() -> Self {
        Self::empty()
    }
}

impl VariableSubstitutor {
    /// Fresh substitutor with its own transient variables.
    pub fn new(environment: Environment, global: GlobalContext) -> Self {
        Self {
            environment,
            global,
            variables: VariableStore::new(),
            dynamic: Arc::new(DynamicRegistry::builtin()),
            project: None,
        }
    }

    /// No environment and an in-memory global context.
    pub fn empty() -> Self {
        Self::new(Environment::empty(), GlobalContext::new())
    }

    /// Enables project-aware dynamic variables such as `$projectRoot` and `$dotenv`.
    ///
    /// Without a project those variables resolve to their default.
    pub fn with_project(mut self, project: ProjectContext) -> Self {
        self.project = Some(project);
        self
    }

    /// Replaces the builtin dynamic variables.
    ///
    /// # Arguments
    ///
    /// * `registry` - Catalog consulted for every `$name` reference
    pub fn with_dynamic_registry(mut self, registry: DynamicRegistry) -> Self {
        self.dynamic = Arc::new(registry);
        self
    }

    /// Transient variables of this run.
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// Global context shared across runs.
    pub fn global(&self) -> &GlobalContext {
        &self.global
    }

    /// Environment(s) selected for this run.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn project(&self) -> Option<&ProjectContext> {
        self.project.as_ref()
    }

    /// Resolves a parsed reference, falling back to its default text.
    pub fn resolve(&self, reference: &VariableReference) -> Option<String> {
        let default = reference.default_text.as_deref();
        match reference.kind {
            VariableKind::Dynamic => self.dynamic_value(&reference.name, default),
            VariableKind::Environment => self.scoped_value(&reference.name, default),
        }
    }

    /// Resolves `name` as written: a leading `$` selects the dynamic registry.
    pub fn variable_value(&self, name: &str, default: Option<&str>) -> Option<String> {
        match name.strip_prefix(DYNAMIC_SIGIL) {
            Some(dynamic) => self.dynamic_value(dynamic.trim(), default),
            None => self.scoped_value(name, default),
        }
    }

    /// Parses `text` as a template and renders it.
    pub fn substitute(&self, text: &str) -> String {
        render_all(&TemplateNode::parse_text(text), self)
    }

    fn dynamic_value(&self, invocation: &str, default: Option<&str>) -> Option<String> {
        let (name, args) = split_invocation(invocation);
        if name.is_empty() {
            return default.map(str::to_string);
        }

        let value = if self.dynamic.is_project_aware(name) {
            self.project
                .as_ref()
                .and_then(|project| self.dynamic.project_value(name, &args, project))
        } else {
            self.dynamic.value(name, &args)
        };

        value.or_else(|| default.map(str::to_string))
    }

    fn scoped_value(&self, name: &str, default: Option<&str>) -> Option<String> {
        if name.trim().is_empty() {
            return default.map(str::to_string);
        }

        if let Some(value) = self.variables.get(name) {
            log::debug!("Resolved '{}' from transient variables", name);
            return Some(value);
        }

        if let Some(value) = self.global.get_value(name) {
            log::debug!("Resolved '{}' from global context", name);
            return Some(value);
        }

        if let Some(value) = self.environment.get_variable_value(name) {
            log::debug!("Resolved '{}' from environment", name);
            return Some(value);
        }

        log::debug!("Variable '{}' unresolved", name);
        default.map(str::to_string)
    }
}
