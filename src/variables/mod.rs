//! Variable resolution.
//!
//! - **store**: transient variables and the project-wide global context
//! - **dynamic**: computed `$` variables
//! - **substitutor**: the precedence chain tying them to an environment

pub mod dynamic;
pub mod store;
pub mod substitutor;

pub use dynamic::{DynamicError, DynamicRegistry, DynamicVariable};
pub use store::{GlobalContext, StoreError, VariableStore};
pub use substitutor::VariableSubstitutor;

/// Per-run variables set by scripts; highest precedence.
pub type TransientVariables = VariableStore;
