//! Syntax tree for request templates.
//!
//! A template value (request target, header value, body) is held as a tree of
//! `TemplateNode`s. Variable references are kept as dedicated nodes so they
//! can be resolved every time the template is rendered.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sigil marking a dynamic (computed) variable, as in `{{$uuid}}`.
pub const DYNAMIC_SIGIL: char = '$';

/// Separator between a variable name and its fallback text: `{{host:localhost}}`.
pub const DEFAULT_SEPARATOR: char = ':';

static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("variable regex is valid"));

/// Which resolution path a variable reference takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Plain `{{name}}`, resolved through transient, global and environment scopes.
    Environment,
    /// `{{$name}}`, resolved only against the dynamic variable registry.
    Dynamic,
}

/// A `{{...}}` reference found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// Resolution path for this reference.
    pub kind: VariableKind,

    /// Variable name. For dynamic references the sigil is already stripped and
    /// the remainder trimmed, so `{{$randomInt 1 10}}` has name `randomInt 1 10`.
    pub name: String,

    /// Literal text used when the name does not resolve.
    pub default_text: Option<String>,

    /// The reference exactly as written, braces included.
    pub raw: String,
}

impl VariableReference {
    /// Builds a plain environment-style reference.
    pub fn environment(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: VariableKind::Environment,
            raw: format!("{{{{{}}}}}", name),
            name,
            default_text: None,
        }
    }

    /// Builds a dynamic reference; `name` is given without the sigil.
    pub fn dynamic(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: VariableKind::Dynamic,
            raw: format!("{{{{{}{}}}}}", DYNAMIC_SIGIL, name),
            name,
            default_text: None,
        }
    }

    /// Attaches fallback text to the reference.
    pub fn with_default(mut self, default_text: impl Into<String>) -> Self {
        self.default_text = Some(default_text.into());
        self
    }

    /// Parses the text between `{{` and `}}`.
    ///
    /// Everything after the first `:` becomes the fallback text. A leading `$`
    /// (after trimming) selects the dynamic path.
    pub fn from_inner(inner: &str, raw: impl Into<String>) -> Self {
        let (name_part, default_text) = match inner.split_once(DEFAULT_SEPARATOR) {
            Some((name, default)) => (name, Some(default.to_string())),
            None => (inner, None),
        };
        let name_part = name_part.trim();

        let (kind, name) = match name_part.strip_prefix(DYNAMIC_SIGIL) {
            Some(rest) => (VariableKind::Dynamic, rest.trim().to_string()),
            None => (VariableKind::Environment, name_part.to_string()),
        };

        Self {
            kind,
            name,
            default_text,
            raw: raw.into(),
        }
    }

    /// Whether this reference goes to the dynamic registry.
    pub fn is_dynamic(&self) -> bool {
        self.kind == VariableKind::Dynamic
    }
}

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// Literal text, emitted verbatim.
    Text(String),
    /// A comment line; callers usually filter these out when rendering.
    Comment(String),
    /// A variable reference.
    Variable(VariableReference),
    /// A sequence of child nodes in document order.
    Composite(Vec<TemplateNode>),
}

impl TemplateNode {
    /// Splits a line or block of text into literal and variable children.
    ///
    /// Always returns a `Composite`, even when there is a single child.
    pub fn parse_text(text: &str) -> Self {
        TemplateNode::Composite(Self::parse_children(text))
    }

    /// Same as [`TemplateNode::parse_text`] but returns the bare children.
    pub fn parse_children(text: &str) -> Vec<TemplateNode> {
        let mut children = Vec::new();
        let mut last_end = 0;

        for cap in VARIABLE_REGEX.captures_iter(text) {
            let (Some(full), Some(inner)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            if full.start() > last_end {
                children.push(TemplateNode::Text(text[last_end..full.start()].to_string()));
            }
            children.push(TemplateNode::Variable(VariableReference::from_inner(
                inner.as_str(),
                full.as_str(),
            )));
            last_end = full.end();
        }

        if last_end < text.len() {
            children.push(TemplateNode::Text(text[last_end..].to_string()));
        }

        children
    }

    /// Source text of the node, with every variable left unresolved.
    pub fn raw_text(&self) -> String {
        match self {
            TemplateNode::Text(text) | TemplateNode::Comment(text) => text.clone(),
            TemplateNode::Variable(variable) => variable.raw.clone(),
            TemplateNode::Composite(children) => children.iter().map(Self::raw_text).collect(),
        }
    }

    /// Whether the node is a comment.
    pub fn is_comment(&self) -> bool {
        matches!(self, TemplateNode::Comment(_))
    }

    /// Children of a composite; empty for leaves.
    pub fn children(&self) -> &[TemplateNode] {
        match self {
            TemplateNode::Composite(children) => children,
            _ => &[],
        }
    }

    /// All variable references in the subtree, in document order.
    pub fn variables(&self) -> Vec<&VariableReference> {
        let mut found = Vec::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables<'a>(&'a self, found: &mut Vec<&'a VariableReference>) {
        match self {
            TemplateNode::Variable(variable) => found.push(variable),
            TemplateNode::Composite(children) => {
                for child in children {
                    child.collect_variables(found);
                }
            }
            TemplateNode::Text(_) | TemplateNode::Comment(_) => {}
        }
    }
}
