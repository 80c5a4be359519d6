//! Data models for resolved HTTP requests and their responses.

pub mod request;
pub mod response;

pub use request::{HttpMethod, HttpRequest};
pub use response::HttpResponse;
