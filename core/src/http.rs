//! HTTP transport types and the default blocking transport.
//!
//! # Design
//! Requests and responses are plain data. `SmotreshkaClient::build_*` produces
//! an `HttpRequest` without touching the network, and a `Transport` turns it
//! into an `HttpResponse`. The default `UreqTransport` owns a single
//! `ureq::Agent` that is reused for every call; tests and embedding
//! applications can plug in their own `Transport`.

use std::time::Duration;

use ureq::http::StatusCode;

use crate::error::ApiError;

pub const CONTENT_TYPE: &str = "content-type";
pub const APPLICATION_JSON: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is already resolved against the client's base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
///
/// `body` is decoded as UTF-8; invalid sequences are replaced with U+FFFD.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// 4xx and 5xx responses.
    pub fn is_bad_response(&self) -> bool {
        self.status >= 400
    }

    /// Textual reason for the status code, e.g. "Not Found".
    ///
    /// This is the canonical phrase for the code, not the text of the
    /// server's status line: ureq does not expose the wire reason, so
    /// `404 Account Missing` still reads "Not Found". Codes without a
    /// registered phrase fall back to the number itself.
    pub fn reason_phrase(&self) -> String {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .map(str::to_string)
            .unwrap_or_else(|| self.status.to_string())
    }
}

/// Executes one `HttpRequest` and returns whatever the server answered.
///
/// Implementations must return `Ok` for every response that arrived,
/// including 4xx/5xx, and `Err(ApiError::Transport)` only when no response
/// was received.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a reusable `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// The timeout covers the whole call, from resolve to the last body byte.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, None) => with_headers(self.agent.get(url), headers).call(),
            (HttpMethod::Get, Some(body)) => with_headers(self.agent.get(url), headers)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Delete, None) => with_headers(self.agent.delete(url), headers).call(),
            (HttpMethod::Delete, Some(body)) => with_headers(self.agent.delete(url), headers)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), headers).send_empty(),
        };

        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
