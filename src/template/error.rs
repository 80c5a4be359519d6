//! Error types for request file parsing.

use thiserror::Error;

/// Errors that can occur while parsing an `.http` file.
///
/// Every variant carries the 1-based line where the problem was found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Invalid or unsupported HTTP method.
    #[error("Invalid HTTP method '{method}' at line {line}. Expected one of: GET, POST, PUT, DELETE, PATCH, OPTIONS, HEAD, TRACE, CONNECT")]
    InvalidMethod { method: String, line: usize },

    /// Target is neither an absolute http(s) URL nor built from variables.
    #[error("Invalid URL '{url}' at line {line}. URL must start with http:// or https:// or contain a {{{{variable}}}}")]
    InvalidUrl { url: String, line: usize },

    /// Header line without a `Name: value` shape.
    #[error("Invalid header format '{header}' at line {line}. Expected format: 'Header-Name: value'")]
    InvalidHeader { header: String, line: usize },

    /// Request line with a method but no target.
    #[error("Missing URL in request line at line {line}. Expected format: 'METHOD URL [HTTP/VERSION]'")]
    MissingUrl { line: usize },

    /// Block with nothing but comments and blank lines.
    #[error("Empty request block at line {line}")]
    EmptyRequest { line: usize },

    /// `> {%` without a closing `%}`.
    #[error("Unterminated response handler starting at line {line}. Expected '%}}'")]
    UnterminatedHandler { line: usize },
}

impl ParseError {
    /// Returns the line number associated with this error.
    pub fn line(&self) -> usize {
        match self {
            ParseError::InvalidMethod { line, .. }
            | ParseError::InvalidUrl { line, .. }
            | ParseError::InvalidHeader { line, .. }
            | ParseError::MissingUrl { line }
            | ParseError::EmptyRequest { line }
            | ParseError::UnterminatedHandler { line } => *line,
        }
    }
}
