//! HTTP request execution.
//!
//! The runner talks to the network only through the [`Transport`] trait.
//! [`ReqwestTransport`] is the production implementation; tests substitute
//! their own.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod native;

pub use cancellation::CancelHandle;
pub use config::ExecutionConfig;
pub use error::RequestError;
pub use native::ReqwestTransport;

use crate::models::request::HttpRequest;
use crate::models::response::HttpResponse;
use async_trait::async_trait;

/// Sends one resolved request and returns its response.
///
/// HTTP error statuses are responses, not errors. Implementations should stop
/// early with [`RequestError::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: &HttpRequest,
        cancel: &CancelHandle,
    ) -> Result<HttpResponse, RequestError>;
}

/// Checks that `url` parses and uses `http` or `https`.
pub fn validate_url(url: &str) -> Result<(), RequestError> {
    let parsed = url::Url::parse(url)?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(RequestError::UnsupportedProtocol(format!(
            "Only HTTP and HTTPS are supported, got: {}",
            scheme
        )));
    }

    Ok(())
}
