//! Parsed request templates.
//!
//! A `RequestTemplate` is the unresolved form of a request as written in an
//! `.http` file. It renders into an [`HttpRequest`] through a
//! [`VariableSubstitutor`], and can be rendered any number of times.

use super::node::TemplateNode;
use super::render::render;
use crate::models::{HttpMethod, HttpRequest};
use crate::variables::VariableSubstitutor;
use std::path::{Path, PathBuf};

/// Where a request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File containing the request, or `None` for an in-memory buffer.
    pub file: Option<PathBuf>,
    /// Line of the request line (1-based).
    pub line: usize,
}

impl SourceLocation {
    /// Location inside a file on disk.
    pub fn in_file(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: Some(file.into()),
            line,
        }
    }

    /// Location inside an unsaved buffer.
    pub fn in_memory(line: usize) -> Self {
        Self { file: None, line }
    }

    /// Directory holding the source file, if there is one.
    pub fn directory(&self) -> Option<&Path> {
        self.file.as_deref().and_then(Path::parent)
    }
}

/// Script run after the response arrives (`> {% ... %}` or `> handler.js`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseHandler {
    /// Script text written inline between `{%` and `%}`.
    Inline(String),
    /// Path to a script file, relative to the request file's directory.
    File(PathBuf),
}

/// A header whose name and value may both contain variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    pub name: TemplateNode,
    pub value: TemplateNode,
}

/// One request block from an `.http` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    /// Stable identifier derived from the file name and line.
    pub id: String,

    /// Optional name given with `# @name <name>`.
    pub name: Option<String>,

    pub method: HttpMethod,

    /// Request target, e.g. `{{host}}/users/{{id}}`.
    pub target: TemplateNode,

    pub http_version: Option<String>,

    pub headers: Vec<HeaderTemplate>,

    /// Body lines, comment lines included as [`TemplateNode::Comment`].
    pub body: Option<TemplateNode>,

    pub response_handler: Option<ResponseHandler>,

    pub location: SourceLocation,
}

impl RequestTemplate {
    /// Creates a template with no headers or body.
    pub fn new(method: HttpMethod, target: &str, location: SourceLocation) -> Self {
        Self {
            id: request_id(location.file.as_deref(), location.line),
            name: None,
            method,
            target: TemplateNode::parse_text(target),
            http_version: None,
            headers: Vec::new(),
            body: None,
            response_handler: None,
            location,
        }
    }

    /// Adds a header given as raw `name` / `value` template text.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(HeaderTemplate {
            name: TemplateNode::parse_text(name),
            value: TemplateNode::parse_text(value),
        });
        self
    }

    /// Sets the body from raw template text.
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(TemplateNode::parse_text(body));
        self
    }

    /// Label used in reports: the `@name` when given, otherwise `METHOD target`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{} {}", self.method, self.target.raw_text()),
        }
    }

    /// Resolves every variable and produces a request ready for the transport.
    ///
    /// Comment nodes are dropped from the body. Each call consults the live
    /// scope state of `substitutor`.
    pub fn render(&self, substitutor: &VariableSubstitutor) -> HttpRequest {
        let not_comment = |node: &TemplateNode| !node.is_comment();

        let mut request = HttpRequest::new(
            self.id.clone(),
            self.method,
            render(&self.target, substitutor, not_comment).trim().to_string(),
        );
        request.http_version = self.http_version.clone();
        request.line_number = self.location.line;
        request.file_path = self.location.file.clone().unwrap_or_default();

        for header in &self.headers {
            request.add_header(
                render(&header.name, substitutor, not_comment)
                    .trim()
                    .to_string(),
                render(&header.value, substitutor, not_comment)
                    .trim()
                    .to_string(),
            );
        }

        if let Some(body) = &self.body {
            let rendered = render(body, substitutor, not_comment);
            if !rendered.trim().is_empty() {
                request.set_body(rendered);
            }
        }

        request
    }
}

/// Builds the request identifier from file name and line.
pub fn request_id(file: Option<&Path>, line: usize) -> String {
    let file_name = file
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("untitled");
    format!("{}_line_{}", file_name, line)
}
