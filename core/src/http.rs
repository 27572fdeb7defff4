//! HTTP request/response types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. `Connection` builds an
//! `HttpRequest`, hands it to a `Transport`, and interprets the returned
//! `HttpResponse`. The default transport is `UreqTransport`; tests plug in
//! stubs that record requests and replay canned responses, which keeps the
//! path/typecasting logic testable without a network.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, Result};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute. `body` may be present on any method, including GET:
/// the legacy protocol sends its parameters as a serialized GET body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body_str(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Convert a non-2xx response into `Error::Remote`.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Remote {
                status: self.status,
                message: self.reason,
            })
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// `Authorization` header value for HTTP basic authentication.
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Executes an `HttpRequest` against the network.
///
/// Implementations must return non-2xx responses as `Ok` data; only failures
/// below HTTP (DNS, connect, TLS, deadline) are `Err(Error::Transport)`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by `ureq`.
///
/// Status codes are returned as data rather than errors so `Connection`
/// owns status interpretation.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse> {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(req.timeout)
            .build()
            .new_agent();

        let result = match req.method {
            HttpMethod::Get => {
                let mut builder = agent.get(&req.url);
                for (k, v) in &req.query {
                    builder = builder.query(k, v);
                }
                for (k, v) in &req.headers {
                    builder = builder.header(k, v);
                }
                match &req.body {
                    Some(body) => builder.force_send_body().send(&body[..]),
                    None => builder.call(),
                }
            }
            HttpMethod::Delete => {
                let mut builder = agent.delete(&req.url);
                for (k, v) in &req.query {
                    builder = builder.query(k, v);
                }
                for (k, v) in &req.headers {
                    builder = builder.header(k, v);
                }
                match &req.body {
                    Some(body) => builder.force_send_body().send(&body[..]),
                    None => builder.call(),
                }
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if req.method == HttpMethod::Post {
                    agent.post(&req.url)
                } else {
                    agent.put(&req.url)
                };
                for (k, v) in &req.query {
                    builder = builder.query(k, v);
                }
                for (k, v) in &req.headers {
                    builder = builder.header(k, v);
                }
                match &req.body {
                    Some(body) => builder.send(&body[..]),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            headers,
            body,
        })
    }
}
