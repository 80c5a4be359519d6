//! HTTP request execution error types.

use thiserror::Error;

/// Errors that can occur while sending a request.
///
/// The runner reports these per request and moves on to the next one.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Connection failures, DNS errors and other network-level issues.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// No complete response within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Certificate validation or handshake failure.
    #[error("TLS/SSL error: {0}")]
    TlsError(String),

    /// Invalid header name or value, or a malformed response.
    #[error("HTTP protocol error: {0}")]
    ProtocolError(String),

    /// The client or request could not be built.
    #[error("Request build error: {0}")]
    BuildError(String),

    /// Only `http` and `https` are supported.
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// The batch was cancelled while the request was in flight.
    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_builder() {
            RequestError::BuildError(message)
        } else if message.contains("certificate") || message.contains("TLS") || message.contains("SSL")
        {
            RequestError::TlsError(message)
        } else {
            RequestError::NetworkError(message)
        }
    }
}

impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        RequestError::InvalidUrl(err.to_string())
    }
}
