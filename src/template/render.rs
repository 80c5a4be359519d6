//! Template rendering.
//!
//! Walks a node tree and produces text, substituting variable nodes through a
//! [`VariableSubstitutor`]. Rendering never caches: the same tree rendered
//! twice reads the scopes twice.

use super::node::TemplateNode;
use crate::variables::VariableSubstitutor;

/// Renders `node`, keeping every non-variable child.
pub fn render_all(node: &TemplateNode, substitutor: &VariableSubstitutor) -> String {
    render(node, substitutor, |_| true)
}

/// Renders `node`, appending a non-variable child only when `filter` accepts it.
///
/// - a variable node renders to its resolved value (empty when unresolved and
///   without fallback text);
/// - a composite renders its direct children in order; variable children are
///   always substituted, other children contribute their raw text;
/// - any other leaf renders to its raw text.
pub fn render<F>(node: &TemplateNode, substitutor: &VariableSubstitutor, filter: F) -> String
where
    F: Fn(&TemplateNode) -> bool,
{
    match node {
        TemplateNode::Variable(variable) => substitutor.resolve(variable).unwrap_or_default(),
        TemplateNode::Composite(children) => {
            let mut builder = String::new();
            for child in children {
                match child {
                    TemplateNode::Variable(variable) => {
                        builder.push_str(&substitutor.resolve(variable).unwrap_or_default());
                    }
                    other if filter(other) => builder.push_str(&other.raw_text()),
                    _ => {}
                }
            }
            builder
        }
        leaf => leaf.raw_text(),
    }
}
