//! Infrastructure configuration - things that cannot change at runtime.

use serde::{Deserialize, Serialize};

/// Network bind address for the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindConfig {
    /// Interface to bind.
    /// Default: 0.0.0.0
    #[serde(default = "BindConfig::default_host")]
    pub host: String,

    /// HTTP port for the chat, health and lottery endpoints.
    /// Default: 8000
    #[serde(default = "BindConfig::default_http_port")]
    pub http_port: u16,
}

impl BindConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_http_port() -> u16 {
        8000
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            http_port: Self::default_http_port(),
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter directive (trace, debug, info, or a full `EnvFilter` string).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,

    /// OTLP gRPC endpoint. Spans are only exported when this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            otlp_endpoint: None,
        }
    }
}
