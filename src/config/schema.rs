//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the load balancer.
//! Keys are camelCase so that the deployed YAML files read naturally:
//!
//! ```yaml
//! addresses: "10.0.0.1:8080,10.0.0.2:8080"
//! protocol: http
//! ports:
//!   tcp: 7006
//!   http: 80
//!   metrics: 9090
//! healthCheck:
//!   cadenceSeconds: 5
//!   timeoutSeconds: 2
//! ```

use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::time::Duration;

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadBalancerConfig {
    /// Comma-separated list of backend `host:port` addresses.
    pub addresses: String,

    /// Serving mode.
    pub protocol: Protocol,

    /// Host the listeners bind to.
    pub host: String,

    /// Listener ports.
    pub ports: PortsConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Optional deadlines on backend dial and relay.
    pub timeouts: TimeoutConfig,

    /// TCP listener limits.
    pub listener: ListenerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            addresses: String::new(),
            protocol: Protocol::default(),
            host: "0.0.0.0".to_string(),
            ports: PortsConfig::default(),
            health_check: HealthCheckConfig::default(),
            timeouts: TimeoutConfig::default(),
            listener: ListenerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl LoadBalancerConfig {
    /// Split `addresses` into the ordered list of target addresses.
    ///
    /// Entries are trimmed; empty entries are kept so validation can report them.
    pub fn target_addresses(&self) -> Vec<String> {
        if self.addresses.trim().is_empty() {
            return Vec::new();
        }
        self.addresses
            .split(',')
            .map(|address| address.trim().to_string())
            .collect()
    }

    /// Parsed `host`. IPv4 and IPv6 literals are both accepted.
    pub fn bind_ip(&self) -> Result<IpAddr, AddrParseError> {
        self.host.parse()
    }

    pub fn tcp_bind_address(&self) -> Result<SocketAddr, AddrParseError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.ports.tcp))
    }

    pub fn http_bind_address(&self) -> Result<SocketAddr, AddrParseError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.ports.http))
    }

    pub fn metrics_bind_address(&self) -> Result<SocketAddr, AddrParseError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.ports.metrics))
    }

    /// Bind address of whichever listener the selected protocol uses.
    pub fn serving_bind_address(&self) -> Result<SocketAddr, AddrParseError> {
        match self.protocol {
            Protocol::Http => self.http_bind_address(),
            Protocol::Tcp => self.tcp_bind_address(),
        }
    }
}

/// Serving mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// HTTP reverse proxy.
    #[default]
    Http,
    /// Raw TCP relay.
    Tcp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

/// Listener ports.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PortsConfig {
    pub tcp: u16,
    pub http: u16,
    pub metrics: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            tcp: 7006,
            http: 80,
            metrics: 9090,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthCheckConfig {
    /// Seconds between the start of two health check cycles.
    pub cadence_seconds: u64,

    /// Per-probe connect timeout in seconds.
    pub timeout_seconds: u64,
}

impl HealthCheckConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            cadence_seconds: 5,
            timeout_seconds: 2,
        }
    }
}

/// Optional deadlines for relay operations. Unset means unbounded.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// Bound on establishing the backend connection.
    pub connect_seconds: Option<u64>,

    /// Bound on each relay pass (TCP) or the backend exchange (HTTP).
    pub relay_seconds: Option<u64>,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Option<Duration> {
        self.connect_seconds.map(Duration::from_secs)
    }

    pub fn relay(&self) -> Option<Duration> {
        self.relay_seconds.map(Duration::from_secs)
    }
}

/// TCP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListenerConfig {
    /// Maximum concurrent TCP relays (backpressure).
    pub max_connections: usize,

    /// Seconds shutdown waits for in-flight relays or requests.
    pub drain_timeout_seconds: u64,
}

impl ListenerConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            drain_timeout_seconds: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Serve Prometheus metrics on `ports.metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}
