//! Connection configuration.
//!
//! Built once per session and handed to `Connection::establish`. Can be
//! deserialized from a config file or read from `BASECAMP_*` environment
//! variables.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Serialized representation exchanged over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Xml,
    Yaml,
}

impl WireFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            WireFormat::Xml => "application/xml",
            WireFormat::Yaml => "application/x-yaml",
        }
    }

    /// Guess the format of a response from its `Content-Type`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("yaml") {
            Some(WireFormat::Yaml)
        } else if ct.contains("xml") {
            Some(WireFormat::Xml)
        } else {
            None
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Site address, e.g. `you.grouphub.com` or `127.0.0.1:3000`.
    pub host: String,
    #[serde(default)]
    pub use_tls: bool,
    pub username: String,
    pub password: String,
    /// Deadline applied to each call. `None` waits indefinitely.
    #[serde(default, with = "timeout_secs")]
    pub timeout: Option<Duration>,
    /// Default `Accept` format for calls that do not set one.
    #[serde(default)]
    pub format: WireFormat,
}

impl ConnectionConfig {
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            use_tls: false,
            username: username.to_string(),
            password: password.to_string(),
            timeout: None,
            format: WireFormat::Xml,
        }
    }

    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Read `BASECAMP_HOST`, `BASECAMP_USERNAME`, `BASECAMP_PASSWORD` and the
    /// optional `BASECAMP_USE_TLS` / `BASECAMP_TIMEOUT_SECS`.
    ///
    /// Returns `None` when any of the required variables is missing or empty.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let mut config = Self::new(
            &var("BASECAMP_HOST")?,
            &var("BASECAMP_USERNAME")?,
            &var("BASECAMP_PASSWORD")?,
        );
        if let Some(tls) = var("BASECAMP_USE_TLS") {
            config.use_tls = matches!(tls.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(secs) = var("BASECAMP_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            config.timeout = Some(Duration::from_secs(secs));
        }
        Some(config)
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}", self.host.trim_end_matches('/'))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("use_tls", &self.use_tls)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("timeout", &self.timeout)
            .field("format", &self.format)
            .finish()
    }
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
