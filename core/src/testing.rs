//! In-memory transport for tests.
//!
//! `StubTransport` records every request it receives and answers from a queue
//! of canned responses. Clones share state, so a test can keep one handle
//! while the `Connection` owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};

#[derive(Debug, Default)]
struct StubState {
    requests: Vec<HttpRequest>,
    responses: VecDeque<Result<HttpResponse>>,
}

#[derive(Debug, Clone, Default)]
pub struct StubTransport {
    state: Arc<Mutex<StubState>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// An established connection to `example.grouphub.com` as `user`/`secret`.
    pub fn connection(&self) -> Connection {
        let mut conn = Connection::new(self.clone());
        conn.establish(ConnectionConfig::new("example.grouphub.com", "user", "secret"));
        conn
    }

    pub fn push_response(&self, status: u16, body: &str) {
        self.push_response_with_headers(status, body, &[("Content-Type", "application/xml")]);
    }

    pub fn push_response_with_headers(&self, status: u16, body: &str, headers: &[(&str, &str)]) {
        self.lock().responses.push_back(Ok(HttpResponse {
            status,
            reason: reason_phrase(status).to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
        }));
    }

    pub fn push_error(&self, message: &str) {
        self.lock()
            .responses
            .push_back(Err(Error::Transport(message.to_string())));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// The most recent request. Panics if none was made.
    pub fn last_request(&self) -> HttpRequest {
        self.lock()
            .requests
            .last()
            .cloned()
            .expect("no request was sent")
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("no stubbed response".to_string())))
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
