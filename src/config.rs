//! Client configuration.
//!
//! Defaults target a listener on `localhost:8086`. [`ClientConfig::from_env`]
//! layers environment overrides on top, in this order:
//!
//! 1. `GRAPHWIRE_ENDPOINT` - full `tcp://host:port` URL
//! 2. `GRAPHWIRE_HOST` / `GRAPHWIRE_PORT` - individual parts
//! 3. `GRAPHWIRE_REPLY_TIMEOUT_MS` - acknowledgement wait in milliseconds
//!
//! Malformed values are logged and ignored.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tracing::warn;
use url::Url;

/// Default listener host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default listener port.
pub const DEFAULT_PORT: u16 = 8086;

/// Default time to wait for an acknowledgement (milliseconds).
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 5000;

/// Default time to wait for the socket handshake (milliseconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Where and how a [`VisualizationClient`](crate::VisualizationClient) connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on one request/reply exchange.
    pub reply_timeout: Duration,
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            reply_timeout: Duration::from_millis(DEFAULT_REPLY_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("GRAPHWIRE_ENDPOINT") {
            match Self::parse_endpoint(&endpoint) {
                Ok((host, port)) => {
                    config.host = host;
                    config.port = port;
                }
                Err(e) => warn!("Ignoring GRAPHWIRE_ENDPOINT: {:#}", e),
            }
        }

        if let Some(host) = lookup("GRAPHWIRE_HOST") {
            if host.trim().is_empty() {
                warn!("Ignoring empty GRAPHWIRE_HOST");
            } else {
                config.host = host.trim().to_string();
            }
        }

        if let Some(port) = lookup("GRAPHWIRE_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(e) => warn!("Ignoring GRAPHWIRE_PORT={}: {}", port, e),
            }
        }

        if let Some(millis) = lookup("GRAPHWIRE_REPLY_TIMEOUT_MS") {
            match millis.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => config.reply_timeout = Duration::from_millis(millis),
                Ok(_) => warn!("Ignoring GRAPHWIRE_REPLY_TIMEOUT_MS=0"),
                Err(e) => warn!("Ignoring GRAPHWIRE_REPLY_TIMEOUT_MS={}: {}", millis, e),
            }
        }

        config
    }

    /// Parse a `tcp://host:port` endpoint. The port defaults to 8086.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (host, port) = ClientConfig::parse_endpoint("tcp://viz.local:9000")?;
    /// ```
    pub fn parse_endpoint(endpoint: &str) -> Result<(String, u16)> {
        let url = Url::parse(endpoint)
            .with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;

        if url.scheme() != "tcp" {
            bail!("Unsupported endpoint scheme '{}' (expected tcp)", url.scheme());
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow!("Endpoint has no host: {}", endpoint))?;
        // IPv6 literals come back bracketed
        let host = host.trim_start_matches('[').trim_end_matches(']');

        Ok((host.to_string(), url.port().unwrap_or(DEFAULT_PORT)))
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `host:port` for log lines.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Socket endpoint, `tcp://host:port`. IPv6 literals are bracketed.
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') {
            format!("tcp://[{}]:{}", self.host, self.port)
        } else {
            format!("tcp://{}:{}", self.host, self.port)
        }
    }
}
