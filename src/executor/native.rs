//! HTTP transport backed by `reqwest`.

use super::cancellation::CancelHandle;
use super::config::ExecutionConfig;
use super::error::RequestError;
use super::{validate_url, Transport};
use crate::models::request::{HttpMethod, HttpRequest};
use crate::models::response::HttpResponse;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use std::time::Instant;

/// Sends requests with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ExecutionConfig,
}

impl ReqwestTransport {
    /// Builds the client from `config`.
    pub fn new(config: ExecutionConfig) -> Result<Self, RequestError> {
        let redirect = if config.follow_redirects {
            Policy::limited(config.max_redirects as usize)
        } else {
            Policy::none()
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(redirect)
            .danger_accept_invalid_certs(!config.validate_ssl)
            .build()
            .map_err(|e| RequestError::BuildError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        let start_time = Instant::now();
        let mut builder = self.client.request(to_reqwest_method(request.method), &request.url);

        for (name, value) in &self.config.default_headers {
            if request.header(name).is_none() {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;

        let status = response.status();
        let mut http_response = HttpResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown").to_string(),
        );
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => http_response.add_header(name.as_str().to_string(), value.to_string()),
                Err(_) => log::debug!("Dropping non-text response header {}", name),
            }
        }

        let body = response.bytes().await?;
        http_response.set_body(body.to_vec());
        http_response.duration = start_time.elapsed();

        Ok(http_response)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &HttpRequest,
        cancel: &CancelHandle,
    ) -> Result<HttpResponse, RequestError> {
        validate_url(&request.url)?;
        log::debug!("{} {}", request.method, request.url);

        tokio::select! {
            result = self.send(request) => result,
            _ = cancel.cancelled() => Err(RequestError::Cancelled),
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::GET => reqwest::Method::GET,
        HttpMethod::POST => reqwest::Method::POST,
        HttpMethod::PUT => reqwest::Method::PUT,
        HttpMethod::DELETE => reqwest::Method::DELETE,
        HttpMethod::PATCH => reqwest::Method::PATCH,
        HttpMethod::HEAD => reqwest::Method::HEAD,
        HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        HttpMethod::TRACE => reqwest::Method::TRACE,
        HttpMethod::CONNECT => reqwest::Method::CONNECT,
    }
}
