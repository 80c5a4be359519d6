//! Resolution properties over generated names and values.

use proptest::prelude::*;
use rest_runner::environment::{Environment, InMemoryEnvironmentIndex, SearchScope};
use rest_runner::variables::{DynamicRegistry, GlobalContext, VariableSubstitutor};
use std::path::PathBuf;
use std::sync::Arc;

fn name() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_.-]{0,15}"
}

fn value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 /:._-]{0,24}"
}

fn substitutor_with(
    name: &str,
    global_value: Option<&str>,
    env_value: Option<&str>,
) -> VariableSubstitutor {
    let mut index = InMemoryEnvironmentIndex::new();
    if let Some(env_value) = env_value {
        index = index.with_variable("dev", name, env_value);
    }
    let environment = Environment::new(
        Arc::new(index),
        SearchScope::Directory(PathBuf::from("/props")),
        vec!["dev".to_string()],
    );

    let global = GlobalContext::new();
    if let Some(global_value) = global_value {
        global.set_value(name, global_value);
    }
    VariableSubstitutor::new(environment, global)
}

proptest! {
    #[test]
    fn transient_value_always_wins(
        name in name(),
        transient in value(),
        global in proptest::option::of(value()),
        env in proptest::option::of(value()),
        default in proptest::option::of(value()),
    ) {
        let substitutor = substitutor_with(&name, global.as_deref(), env.as_deref());
        substitutor.variables().set(name.clone(), transient.clone());

        prop_assert_eq!(
            substitutor.variable_value(&name, default.as_deref()),
            Some(transient)
        );
    }

    #[test]
    fn scoped_order_is_global_then_environment(
        name in name(),
        global in value(),
        env in value(),
    ) {
        let substitutor = substitutor_with(&name, Some(&global), Some(&env));
        prop_assert_eq!(substitutor.variable_value(&name, None), Some(global));

        substitutor.global().remove_value(&name);
        prop_assert_eq!(substitutor.variable_value(&name, None), Some(env));
    }

    #[test]
    fn dynamic_names_never_read_scopes(
        name in name(),
        scoped in value(),
        default in proptest::option::of(value()),
    ) {
        let substitutor = substitutor_with(&name, Some(&scoped), Some(&scoped))
            .with_dynamic_registry(DynamicRegistry::empty());
        substitutor.variables().set(name.clone(), scoped.clone());

        let dynamic_name = format!("${}", name);
        prop_assert_eq!(
            substitutor.variable_value(&dynamic_name, default.as_deref()),
            default
        );
    }

    #[test]
    fn scoped_resolution_is_idempotent(
        name in name(),
        global in proptest::option::of(value()),
        env in proptest::option::of(value()),
        default in proptest::option::of(value()),
    ) {
        let substitutor = substitutor_with(&name, global.as_deref(), env.as_deref());

        let first = substitutor.variable_value(&name, default.as_deref());
        let second = substitutor.variable_value(&name, default.as_deref());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn text_without_braces_renders_unchanged(text in "[^{}]{0,64}") {
        prop_assert_eq!(VariableSubstitutor::empty().substitute(&text), text);
    }
}
