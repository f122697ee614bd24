//! Client Configuration
//!
//! Everything a session needs to reach the engine. Supplied once when the
//! [`Client`](crate::Client) is built and never changed afterwards.

use crate::protocol::DEFAULT_BUFFER;
use std::time::Duration;
use tracing::warn;

/// Connection settings shared by every socket of a session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Engine host name or IP
    pub host: String,
    /// Engine channel port
    pub port: u16,
    /// Channel password sent in `START`
    pub password: String,
    /// Upper bound on simultaneously open sockets
    pub max_connections: usize,
    /// Engine line buffer in bytes; `PUSH` text is chunked to fit in it
    pub buffer_size: usize,
    /// Optional TCP connect timeout
    pub connect_timeout: Option<Duration>,
    /// Optional timeout for each line read
    pub read_timeout: Option<Duration>,
    /// Optional timeout for each line write
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            password: crate::DEFAULT_PASSWORD.to_string(),
            max_connections: 100,
            buffer_size: DEFAULT_BUFFER,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for `host:port` with default settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the channel password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Sets the maximum number of pooled sockets.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Applies the same timeout to connect, read and write.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self.read_timeout = Some(timeout);
        self.write_timeout = Some(timeout);
        self
    }

    /// Builds a configuration from the defaults overlaid with `SONIC_HOST`,
    /// `SONIC_PORT`, `SONIC_PASSWORD` and `SONIC_MAX_CONNECTIONS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("SONIC_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("SONIC_PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid SONIC_PORT"),
            }
        }
        if let Some(password) = lookup("SONIC_PASSWORD") {
            config.password = password;
        }
        if let Some(max) = lookup("SONIC_MAX_CONNECTIONS") {
            match max.parse::<usize>() {
                Ok(max) if max > 0 => config.max_connections = max,
                _ => warn!(value = %max, "Ignoring invalid SONIC_MAX_CONNECTIONS"),
            }
        }

        config
    }

    /// Returns the `host:port` address string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
