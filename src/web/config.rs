//! Web server configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the web server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address to bind the server to (e.g. `127.0.0.1:8080`)
    pub bind_addr: String,
    /// Deadline for a whole request, in milliseconds; none when unset
    pub request_timeout_ms: Option<u64>,
    /// Whether to attach debug-level request spans
    pub enable_trace: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: crate::DEFAULT_BIND_ADDR.to_string(),
            request_timeout_ms: None,
            enable_trace: true,
        }
    }
}

impl WebConfig {
    /// Create a new web configuration bound to `bind_addr`.
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Default::default()
        }
    }

    /// Set the bind address for the web server.
    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }

    /// Set the deadline applied to every request.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Enable or disable request tracing spans.
    pub fn with_trace(mut self, enable_trace: bool) -> Self {
        self.enable_trace = enable_trace;
        self
    }

    /// The request deadline, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
