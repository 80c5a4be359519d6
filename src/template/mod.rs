//! Request templates: parsing, node trees and rendering.
//!
//! - **node**: the template syntax tree and variable references
//! - **parser**: turns `.http` file text into [`RequestTemplate`]s
//! - **request**: the parsed request and its source location
//! - **render**: substitutes variables while walking a node tree

pub mod error;
pub mod node;
pub mod parser;
pub mod render;
pub mod request;

pub use error::ParseError;
pub use node::{TemplateNode, VariableKind, VariableReference, DYNAMIC_SIGIL};
pub use parser::parse_file;
pub use render::{render, render_all};
pub use request::{HeaderTemplate, RequestTemplate, ResponseHandler, SourceLocation};
