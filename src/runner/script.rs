//! Pre-request and response-handler scripts.
//!
//! Scripts run through a [`ScriptEngine`]. The bundled
//! [`DirectiveScriptEngine`] understands a small statement language:
//!
//! ```text
//! // comments run to the end of the line
//! variables.set("requestId", "req-" + environment.get("prefix"))
//! global.set("token", response.body.auth.token); console.log("stored", response.status)
//! ```
//!
//! Statements are separated by newlines or `;`. Values are string or number
//! literals, `+` concatenations, getters (`environment.get`, `variables.get`,
//! `global.get`) and the read-only paths `request.url`, `request.method`,
//! `request.rawUrl`, `request.name`, `project`, `response.status`,
//! `response.body[.path]`, `response.headers.<Name>` and
//! `response.contentType`.

use super::descriptor::RequestDescriptor;
use super::sink::{ConsoleLevel, ReportingSink};
use crate::environment::Environment;
use crate::models::HttpResponse;
use crate::project::ProjectContext;
use crate::variables::{GlobalContext, VariableStore};
use std::path::PathBuf;
use thiserror::Error;

/// Script loading and evaluation failures.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Syntax error in {origin} at line {line}: {message}")]
    Syntax {
        origin: String,
        line: usize,
        message: String,
    },

    #[error("Error in {origin} at line {line}: {message}")]
    Runtime {
        origin: String,
        line: usize,
        message: String,
    },
}

/// Names a script can see.
pub struct ScriptBindings<'a> {
    /// Transient variables of the run.
    pub variables: &'a VariableStore,
    pub global: &'a GlobalContext,
    pub environment: &'a Environment,
    /// The request about to run (pre-request) or that just ran (handler).
    pub request: Option<&'a RequestDescriptor>,
    /// Only set for response handlers.
    pub response: Option<&'a HttpResponse>,
    pub project: Option<&'a ProjectContext>,
    pub console: &'a dyn ReportingSink,
    /// Console output below this level is dropped.
    pub console_log_level: ConsoleLevel,
}

impl<'a> ScriptBindings<'a> {
    /// Bindings drawn from the descriptor's substitutor.
    pub fn for_descriptor(descriptor: &'a RequestDescriptor, console: &'a dyn ReportingSink) -> Self {
        let substitutor = descriptor.substitutor();
        Self {
            variables: substitutor.variables(),
            global: substitutor.global(),
            environment: substitutor.environment(),
            request: Some(descriptor),
            response: None,
            project: substitutor.project(),
            console,
            console_log_level: ConsoleLevel::default(),
        }
    }

    /// Exposes `response` to the script. Only response handlers get one.
    pub fn with_response(mut self, response: &'a HttpResponse) -> Self {
        self.response = Some(response);
        self
    }

    /// Console output below `level` is dropped.
    pub fn with_console_log_level(mut self, level: ConsoleLevel) -> Self {
        self.console_log_level = level;
        self
    }
}

/// Evaluates script source against a set of bindings.
pub trait ScriptEngine: Send + Sync {
    /// `origin` names the script in error messages (usually its path).
    fn evaluate(
        &self,
        source: &str,
        origin: &str,
        bindings: &ScriptBindings<'_>,
    ) -> Result<(), ScriptError>;
}

/// The bundled statement interpreter.
///
/// Statements run in order; the first failing statement stops the script.
/// Effects of earlier statements are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveScriptEngine;

impl DirectiveScriptEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptEngine for DirectiveScriptEngine {
    fn evaluate(
        &self,
        source: &str,
        origin: &str,
        bindings: &ScriptBindings<'_>,
    ) -> Result<(), ScriptError> {
        let syntax = |(line, message): (usize, String)| ScriptError::Syntax {
            origin: origin.to_string(),
            line,
            message,
        };

        let tokens = tokenize(source).map_err(syntax)?;
        let statements = parse_statements(&tokens).map_err(syntax)?;

        for statement in &statements {
            execute(statement, bindings).map_err(|message| ScriptError::Runtime {
                origin: origin.to_string(),
                line: statement.line,
                message,
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Plus,
    Separator,
}

#[derive(Debug, Clone, PartialEq)]
struct Lexed {
    token: Token,
    line: usize,
}

fn tokenize(source: &str) -> Result<Vec<Lexed>, (usize, String)> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        let token = match c {
            '\n' => {
                let token = Token::Separator;
                tokens.push(Lexed { token, line });
                line += 1;
                continue;
            }
            ';' => Token::Separator,
            c if c.is_whitespace() => continue,
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().map_or(false, |next| *next != '\n') {
                    chars.next();
                }
                continue;
            }
            '"' | '\'' => Token::Str(lex_string(c, &mut chars, line)?),
            '.' => Token::Dot,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '+' => Token::Plus,
            c if c.is_ascii_digit() || (c == '-' && chars.peek().map_or(false, char::is_ascii_digit)) => {
                let mut number = c.to_string();
                while let Some(next) = chars.peek().copied() {
                    if next.is_ascii_digit() {
                        number.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Number(number)
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut ident = c.to_string();
                while let Some(next) = chars.peek().copied() {
                    if next.is_alphanumeric() || next == '_' || next == '$' || next == '-' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(ident)
            }
            other => return Err((line, format!("unexpected character '{}'", other))),
        };
        tokens.push(Lexed { token, line });
    }

    Ok(tokens)
}

fn lex_string(
    quote: char,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: usize,
) -> Result<String, (usize, String)> {
    let mut value = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => return Ok(value),
            Some('\\') => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(escaped) => value.push(escaped),
                None => break,
            },
            Some('\n') | None => break,
            Some(c) => value.push(c),
        }
    }
    Err((line, "unterminated string literal".to_string()))
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(String),
    Path(Vec<String>),
    Call(Vec<String>, Vec<Expr>),
    Concat(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
struct Statement {
    target: Vec<String>,
    args: Vec<Expr>,
    line: usize,
}

struct Parser<'t> {
    tokens: &'t [Lexed],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|lexed| &lexed.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |lexed| lexed.line)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, (usize, String)> {
        Err((self.line(), message.into()))
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), (usize, String)> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            self.error(format!("expected {}", what))
        }
    }

    fn path(&mut self) -> Result<Vec<String>, (usize, String)> {
        let mut segments = match self.peek() {
            Some(Token::Ident(ident)) => vec![ident.clone()],
            _ => return self.error("expected identifier"),
        };
        self.pos += 1;

        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            match self.peek() {
                Some(Token::Ident(segment)) | Some(Token::Number(segment)) => {
                    segments.push(segment.clone());
                    self.pos += 1;
                }
                _ => return self.error("expected name after '.'"),
            }
        }
        Ok(segments)
    }

    fn args(&mut self) -> Result<Vec<Expr>, (usize, String)> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => return self.error("expected ',' or ')'"),
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, (usize, String)> {
        let mut parts = vec![self.term()?];
        while self.peek() == Some(&Token::Plus) {
            self.pos += 1;
            parts.push(self.term()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Expr::Concat(parts)
        })
    }

    fn term(&mut self) -> Result<Expr, (usize, String)> {
        match self.peek() {
            Some(Token::Str(value)) | Some(Token::Number(value)) => {
                let value = value.clone();
                self.pos += 1;
                Ok(Expr::Literal(value))
            }
            Some(Token::Ident(_)) => {
                let path = self.path()?;
                if self.peek() == Some(&Token::LParen) {
                    Ok(Expr::Call(path, self.args()?))
                } else {
                    Ok(Expr::Path(path))
                }
            }
            _ => self.error("expected a value"),
        }
    }

    fn statement(&mut self) -> Result<Statement, (usize, String)> {
        let line = self.line();
        let target = self.path()?;
        let args = self.args()?;
        match self.peek() {
            None | Some(Token::Separator) => Ok(Statement { target, args, line }),
            _ => self.error("expected end of statement"),
        }
    }
}

fn parse_statements(tokens: &[Lexed]) -> Result<Vec<Statement>, (usize, String)> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut statements = Vec::new();

    while let Some(token) = parser.peek() {
        if *token == Token::Separator {
            parser.pos += 1;
            continue;
        }
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

fn arity(target: &[&str], args: &[Expr], expected: usize) -> Result<(), String> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(format!(
            "{}() takes {} argument(s), got {}",
            target.join("."),
            expected,
            args.len()
        ))
    }
}

fn execute(statement: &Statement, bindings: &ScriptBindings<'_>) -> Result<(), String> {
    let target: Vec<&str> = statement.target.iter().map(String::as_str).collect();
    let args = &statement.args;

    let store = match target.as_slice() {
        ["variables", _] | ["request", "variables", _] => Some(bindings.variables),
        ["global", _] | ["client", "global", _] => Some(bindings.global.variables()),
        _ => None,
    };

    if let (Some(store), Some(action)) = (store, target.last()) {
        match *action {
            "set" => {
                arity(&target, args, 2)?;
                let name = evaluate(&args[0], bindings)?;
                let value = evaluate(&args[1], bindings)?;
                store.set(name, value);
                return Ok(());
            }
            "clear" => {
                arity(&target, args, 1)?;
                store.remove(&evaluate(&args[0], bindings)?);
                return Ok(());
            }
            "clearAll" => {
                arity(&target, args, 0)?;
                store.clear();
                return Ok(());
            }
            _ => {}
        }
    }

    let level = match target.as_slice() {
        ["console", "log"] | ["console", "info"] | ["client", "log"] => Some(ConsoleLevel::Info),
        ["console", "debug"] => Some(ConsoleLevel::Debug),
        ["console", "warn"] => Some(ConsoleLevel::Warn),
        ["console", "error"] => Some(ConsoleLevel::Error),
        _ => None,
    };

    if let Some(level) = level {
        let parts = args
            .iter()
            .map(|arg| evaluate(arg, bindings))
            .collect::<Result<Vec<_>, _>>()?;
        if level >= bindings.console_log_level {
            bindings.console.on_console_output(level, &parts.join(" "));
        }
        return Ok(());
    }

    Err(format!("unknown statement '{}'", target.join(".")))
}

fn evaluate(expr: &Expr, bindings: &ScriptBindings<'_>) -> Result<String, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Concat(parts) => parts.iter().map(|part| evaluate(part, bindings)).collect(),
        Expr::Call(path, args) => call(path, args, bindings),
        Expr::Path(path) => read_path(path, bindings),
    }
}

fn call(path: &[String], args: &[Expr], bindings: &ScriptBindings<'_>) -> Result<String, String> {
    let target: Vec<&str> = path.iter().map(String::as_str).collect();
    arity(&target, args, 1)?;
    let name = evaluate(&args[0], bindings)?;

    let value = match target.as_slice() {
        ["environment", "get"] => bindings.environment.get_variable_value(&name),
        ["variables", "get"] | ["request", "variables", "get"] => bindings.variables.get(&name),
        ["global", "get"] | ["client", "global", "get"] => bindings.global.get_value(&name),
        _ => return Err(format!("unknown function '{}'", target.join("."))),
    };
    Ok(value.unwrap_or_default())
}

fn read_path(path: &[String], bindings: &ScriptBindings<'_>) -> Result<String, String> {
    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
    let missing = |what: &str| format!("'{}' is not available in this script", what);

    match segments.as_slice() {
        ["project"] | ["project", "root"] => bindings
            .project
            .map(|project| project.root().display().to_string())
            .ok_or_else(|| missing("project")),
        ["request", field] => {
            let descriptor = bindings.request.ok_or_else(|| missing("request"))?;
            match *field {
                "url" => Ok(descriptor.render().url),
                "method" => Ok(descriptor.template().method.to_string()),
                "rawUrl" => Ok(descriptor.template().target.raw_text()),
                "name" => Ok(descriptor.display_name()),
                other => Err(format!("unknown request property '{}'", other)),
            }
        }
        ["response", rest @ ..] => {
            let response = bindings.response.ok_or_else(|| missing("response"))?;
            read_response(response, rest)
        }
        _ => Err(format!("unknown value '{}'", segments.join("."))),
    }
}

fn read_response(response: &HttpResponse, path: &[&str]) -> Result<String, String> {
    match path {
        ["status"] => Ok(response.status_code.to_string()),
        ["contentType"] => Ok(response.content_type().unwrap_or_default().to_string()),
        ["body"] => Ok(response.body_text()),
        ["body", rest @ ..] => {
            let json = response
                .body_json()
                .ok_or_else(|| "response body is not JSON".to_string())?;
            let value = rest
                .iter()
                .try_fold(&json, |value, segment| match value {
                    serde_json::Value::Array(items) => {
                        segment.parse::<usize>().ok().and_then(|i| items.get(i))
                    }
                    other => other.get(*segment),
                })
                .ok_or_else(|| format!("response.body.{} is undefined", rest.join(".")))?;
            Ok(match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            })
        }
        ["headers", name] => response
            .header(name)
            .map(str::to_string)
            .ok_or_else(|| format!("response header '{}' is not present", name)),
        _ => Err(format!("unknown response property '{}'", path.join("."))),
    }
}
