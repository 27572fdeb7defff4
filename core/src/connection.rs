//! Authenticated access to a Basecamp site.
//!
//! # Design
//! `Connection` is the explicit session context: it owns the configuration
//! and the transport, and every resource or legacy call borrows it. Swapping
//! the configuration goes through `establish(&mut self, ..)`, so it cannot
//! race with calls that hold a shared borrow.
//!
//! No retries happen here. A transport failure or an unexpected status is
//! the caller's to handle.

use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::http::{basic_auth, HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};

pub struct Connection {
    config: Option<ConnectionConfig>,
    transport: Box<dyn Transport>,
}

impl Connection {
    /// Create an unconfigured connection over `transport`.
    ///
    /// Every verb fails with `Error::NotConfigured` until `establish` is
    /// called.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            config: None,
            transport: Box::new(transport),
        }
    }

    /// Establish a connection using the default `ureq` transport.
    pub fn connect(config: ConnectionConfig) -> Self {
        let mut conn = Self::new(UreqTransport);
        conn.establish(config);
        conn
    }

    /// Set the configuration, replacing any previous one.
    pub fn establish(&mut self, config: ConnectionConfig) {
        debug!(host = %config.host, use_tls = config.use_tls, "establishing connection");
        self.config = Some(config);
    }

    pub fn config(&self) -> Result<&ConnectionConfig> {
        self.config.as_ref().ok_or(Error::NotConfigured)
    }

    pub fn is_established(&self) -> bool {
        self.config.is_some()
    }

    pub fn get(&self, path: &str, body: Option<Vec<u8>>, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(HttpMethod::Get, path, &[], body, headers)
    }

    pub fn post(&self, path: &str, body: Option<Vec<u8>>, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(HttpMethod::Post, path, &[], body, headers)
    }

    pub fn put(&self, path: &str, body: Option<Vec<u8>>, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(HttpMethod::Put, path, &[], body, headers)
    }

    pub fn delete(&self, path: &str, body: Option<Vec<u8>>, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(HttpMethod::Delete, path, &[], body, headers)
    }

    /// Build and execute a request relative to the configured site.
    ///
    /// Adds basic auth and, unless `headers` already has one, an `Accept`
    /// header for the configured wire format. The response is returned
    /// whatever its status.
    pub fn send(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<Vec<u8>>,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let config = self.config()?;

        let mut all_headers: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("accept")) {
            all_headers.push(("Accept".to_string(), config.format.media_type().to_string()));
        }
        all_headers.push((
            "Authorization".to_string(),
            basic_auth(&config.username, &config.password),
        ));

        let request = HttpRequest {
            method,
            url: format!("{}{}", config.base_url(), path),
            query: query.to_vec(),
            headers: all_headers,
            body,
            timeout: config.timeout,
        };

        debug!(method = method.as_str(), path, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(status = response.status, path, "received response");
        Ok(response)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::WireFormat;
    use crate::testing::StubTransport;

    #[test]
    fn verbs_fail_before_establish() {
        let conn = Connection::new(StubTransport::new());
        let err = conn.get("/account.xml", None, &[]).unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
        assert!(!conn.is_established());
    }

    #[test]
    fn requests_carry_auth_and_accept() {
        let stub = StubTransport::new();
        stub.push_response(200, "<account/>");
        let conn = stub.connection();

        conn.get("/account.xml", None, &[]).unwrap();

        let req = stub.last_request();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://example.grouphub.com/account.xml");
        assert_eq!(req.header("accept"), Some("application/xml"));
        assert_eq!(req.header("authorization"), Some(basic_auth("user", "secret").as_str()));
    }

    #[test]
    fn caller_accept_header_wins() {
        let stub = StubTransport::new();
        stub.push_response(200, "");
        let conn = stub.connection();

        conn.get("/projects.xml", None, &[("Accept", "application/x-yaml")]).unwrap();

        let accepts: Vec<_> = stub
            .last_request()
            .headers
            .into_iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("accept"))
            .collect();
        assert_eq!(accepts.len(), 1);
        assert_eq!(accepts[0].1, "application/x-yaml");
    }

    #[test]
    fn get_keeps_its_body() {
        let stub = StubTransport::new();
        stub.push_response(200, "");
        let conn = stub.connection();

        conn.get("/projects/1/milestones/list", Some(b"find: all".to_vec()), &[]).unwrap();

        assert_eq!(stub.last_request().body_str(), Some("find: all"));
    }

    #[test]
    fn establish_replaces_previous_config() {
        let stub = StubTransport::new();
        stub.push_response(200, "");
        let mut conn = stub.connection();
        conn.establish(
            ConnectionConfig::new("other.grouphub.com", "u2", "p2")
                .use_tls(true)
                .timeout(Duration::from_secs(5))
                .format(WireFormat::Yaml),
        );

        conn.delete("/time_entries/3.xml", None, &[]).unwrap();

        let req = stub.last_request();
        assert_eq!(req.url, "https://other.grouphub.com/time_entries/3.xml");
        assert_eq!(req.timeout, Some(Duration::from_secs(5)));
        assert_eq!(req.header("accept"), Some("application/x-yaml"));
    }

    #[test]
    fn transport_errors_propagate() {
        let stub = StubTransport::new();
        stub.push_error("connection refused");
        let conn = stub.connection();

        let err = conn.post("/upload", Some(vec![1, 2, 3]), &[]).unwrap_err();
        assert!(matches!(err, Error::Transport(ref m) if m == "connection refused"));
    }
}
