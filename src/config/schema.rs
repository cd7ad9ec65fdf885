//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MediatorConfig {
    /// Force every dispatched request to cache-only.
    pub offline: bool,

    /// Outbound transport settings.
    pub transport: TransportConfig,

    /// Defaults applied to requests built by the CLI.
    pub requests: RequestDefaults,

    /// Bearer-token authorisers, consulted in order.
    pub authorisers: Vec<AuthoriserConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// User-Agent sent when the request does not set one.
    pub user_agent: String,

    /// Idle pooled connections are closed after this many seconds.
    pub pool_idle_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            user_agent: concat!("fetch-mediator/", env!("CARGO_PKG_VERSION")).to_string(),
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Request defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RequestDefaults {
    /// Absolute request timeout in milliseconds (0 = none).
    pub default_timeout_ms: u64,
}

impl RequestDefaults {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
        }
    }
}

/// A bearer-token authoriser bound to one host.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthoriserConfig {
    /// Identifier for logging.
    pub name: String,

    /// Host whose requests this authoriser claims.
    pub host: String,

    /// Tokens tried in order; a rejected token is replaced by the next.
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
