//! `.http` file parser.
//!
//! Turns the text of an `.http` / `.rest` file into [`RequestTemplate`]s.
//! Requests are separated by `###` lines. Within a block:
//!
//! ```text
//! # @name login                 <- optional name
//! POST {{host}}/login HTTP/1.1  <- request line
//! Content-Type: application/json
//!                               <- blank line ends headers
//! {"user": "{{user}}"}          <- body, comment lines kept as comment nodes
//!
//! > {% global.set("token", response.body.token) %}
//! ```

use super::error::ParseError;
use super::node::TemplateNode;
use super::request::{request_id, HeaderTemplate, RequestTemplate, ResponseHandler, SourceLocation};
use crate::models::HttpMethod;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static REQUEST_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)\s+(.+?)(?:\s+(HTTP/\d+(?:\.\d+)?))?$")
        .expect("request line regex is valid")
});

static NAME_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:#|//)\s*@name\s+(\S+)").expect("name tag regex is valid")
});

/// Parses every request in `content`.
///
/// `file_path` is recorded in each template's location; pass `None` for an
/// unsaved buffer.
///
/// # Examples
///
/// ```
/// use rest_runner::template::parse_file;
///
/// let content = "GET https://api.example.com/users\n\n###\n\nDELETE {{host}}/users/1\n";
/// let requests = parse_file(content, None).unwrap();
/// assert_eq!(requests.len(), 2);
/// ```
pub fn parse_file(
    content: &str,
    file_path: Option<&Path>,
) -> Result<Vec<RequestTemplate>, ParseError> {
    let mut requests = Vec::new();
    let mut current_block: Vec<(usize, &str)> = Vec::new();
    let mut block_start_line = 1;

    let normalized = content.replace("\r\n", "\n");

    for (idx, line) in normalized.lines().enumerate() {
        let line_num = idx + 1;
        if line.trim_start().starts_with("###") {
            if has_request_line(&current_block) {
                requests.push(parse_request(&current_block, block_start_line, file_path)?);
            }
            current_block.clear();
            block_start_line = line_num + 1;
        } else {
            current_block.push((line_num, line));
        }
    }

    if has_request_line(&current_block) {
        requests.push(parse_request(&current_block, block_start_line, file_path)?);
    }

    Ok(requests)
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with("//")
}

fn has_request_line(lines: &[(usize, &str)]) -> bool {
    lines.iter().any(|(_, line)| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !is_comment(trimmed)
    })
}

/// Parses a single request block.
///
/// `lines` holds `(line_number, text)` pairs; `block_start` is used for the
/// error when the block has no request line.
pub fn parse_request(
    lines: &[(usize, &str)],
    block_start: usize,
    file_path: Option<&Path>,
) -> Result<RequestTemplate, ParseError> {
    let request_idx = lines
        .iter()
        .position(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !is_comment(trimmed)
        })
        .ok_or(ParseError::EmptyRequest { line: block_start })?;

    let name = lines[..request_idx].iter().find_map(|(_, line)| {
        NAME_TAG_REGEX
            .captures(line.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    });

    let (request_line_num, request_line) = lines[request_idx];
    let (method, target, http_version) = parse_request_line(request_line, request_line_num)?;

    let rest = &lines[request_idx + 1..];
    let handler_idx = rest
        .iter()
        .position(|(_, line)| line.trim_start().starts_with('>'));
    let (content_lines, handler_lines) = match handler_idx {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, &rest[rest.len()..]),
    };

    let mut header_lines = Vec::new();
    let mut body_lines: &[(usize, &str)] = &[];
    for (idx, (line_num, line)) in content_lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            body_lines = &content_lines[idx + 1..];
            break;
        }
        if is_comment(trimmed) {
            continue;
        }
        header_lines.push((*line_num, *line));
    }

    let headers = extract_headers(&header_lines)?;
    let body = extract_body(body_lines);
    let response_handler = extract_response_handler(handler_lines)?;

    let location = match file_path {
        Some(path) => SourceLocation::in_file(path, request_line_num),
        None => SourceLocation::in_memory(request_line_num),
    };

    Ok(RequestTemplate {
        id: request_id(file_path, request_line_num),
        name,
        method,
        target: TemplateNode::parse_text(&target),
        http_version,
        headers,
        body,
        response_handler,
        location,
    })
}

/// Splits a request line into method, raw target and optional HTTP version.
///
/// The target must be an absolute http(s) URL unless it contains a variable,
/// in which case it is only checked after substitution by the transport.
pub fn parse_request_line(
    line: &str,
    line_num: usize,
) -> Result<(HttpMethod, String, Option<String>), ParseError> {
    let trimmed = line.trim();

    let Some(captures) = REQUEST_LINE_REGEX.captures(trimmed) else {
        let mut parts = trimmed.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some(method), None) if HttpMethod::parse(method).is_some() => {
                Err(ParseError::MissingUrl { line: line_num })
            }
            (Some(method), _) => Err(ParseError::InvalidMethod {
                method: method.to_string(),
                line: line_num,
            }),
            (None, _) => Err(ParseError::MissingUrl { line: line_num }),
        };
    };

    let method_str = captures.get(1).map_or("", |m| m.as_str());
    let method = HttpMethod::parse(method_str).ok_or_else(|| ParseError::InvalidMethod {
        method: method_str.to_string(),
        line: line_num,
    })?;

    let target = captures.get(2).map_or("", |m| m.as_str()).trim();
    if !target.starts_with("http://") && !target.starts_with("https://") && !target.contains("{{")
    {
        return Err(ParseError::InvalidUrl {
            url: target.to_string(),
            line: line_num,
        });
    }

    let http_version = captures.get(3).map(|m| m.as_str().to_string());

    Ok((method, target.to_string(), http_version))
}

/// Parses `Name: value` header lines into templates.
pub fn extract_headers(lines: &[(usize, &str)]) -> Result<Vec<HeaderTemplate>, ParseError> {
    let mut headers = Vec::new();

    for (line_num, line) in lines {
        let trimmed = line.trim();
        let invalid = || ParseError::InvalidHeader {
            header: trimmed.to_string(),
            line: *line_num,
        };

        let (name, value) = trimmed.split_once(':').ok_or_else(invalid)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }

        headers.push(HeaderTemplate {
            name: TemplateNode::parse_text(name),
            value: TemplateNode::parse_text(value.trim()),
        });
    }

    Ok(headers)
}

/// Builds the body node: one flat composite with comment lines as comment
/// nodes. Returns `None` when the body holds no content besides whitespace.
pub fn extract_body(lines: &[(usize, &str)]) -> Option<TemplateNode> {
    let last_content = lines.iter().rposition(|(_, line)| !line.trim().is_empty())?;
    let lines = &lines[..=last_content];

    let mut children = Vec::new();
    for (idx, (_, line)) in lines.iter().enumerate() {
        let is_last = idx + 1 == lines.len();
        if is_comment(line.trim()) {
            let mut text = line.to_string();
            if !is_last {
                text.push('\n');
            }
            children.push(TemplateNode::Comment(text));
        } else {
            children.extend(TemplateNode::parse_children(line));
            if !is_last {
                children.push(TemplateNode::Text("\n".to_string()));
            }
        }
    }

    if children.iter().all(TemplateNode::is_comment) {
        return None;
    }
    Some(TemplateNode::Composite(children))
}

/// Parses the `>` response handler section at the end of a block.
pub fn extract_response_handler(
    lines: &[(usize, &str)],
) -> Result<Option<ResponseHandler>, ParseError> {
    let Some(((start_line, first), rest)) = lines.split_first() else {
        return Ok(None);
    };

    let after_marker = first.trim_start().trim_start_matches('>').trim();

    let Some(inline) = after_marker.strip_prefix("{%") else {
        if after_marker.is_empty() {
            return Ok(None);
        }
        return Ok(Some(ResponseHandler::File(PathBuf::from(after_marker))));
    };

    if let Some((script, _)) = inline.split_once("%}") {
        return Ok(Some(ResponseHandler::Inline(script.trim().to_string())));
    }

    let mut script = inline.to_string();
    for (_, line) in rest {
        if let Some((tail, _)) = line.split_once("%}") {
            script.push('\n');
            script.push_str(tail);
            return Ok(Some(ResponseHandler::Inline(script.trim().to_string())));
        }
        script.push('\n');
        script.push_str(line);
    }

    Err(ParseError::UnterminatedHandler { line: *start_line })
}
