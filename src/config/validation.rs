//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every target address carries a host and a port
//! - Validate value ranges (cadence and timeout > 0, bound ports distinct)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LoadBalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{LoadBalancerConfig, Protocol};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no target addresses configured")]
    NoTargets,

    #[error("target address #{index} is empty")]
    EmptyAddress { index: usize },

    #[error("target address '{address}' must be host:port")]
    MissingPort { address: String },

    #[error("healthCheck.{field} must be greater than zero")]
    ZeroHealthCheckSetting { field: &'static str },

    #[error("timeouts.{field} must be greater than zero when set")]
    ZeroTimeout { field: &'static str },

    #[error("listener.maxConnections must be greater than zero")]
    ZeroMaxConnections,

    #[error("ports.{first} and ports.{second} both use port {port}")]
    PortConflict {
        first: &'static str,
        second: &'static str,
        port: u16,
    },

    #[error("host '{0}' is not an IP address")]
    InvalidHost(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &LoadBalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let addresses = config.target_addresses();
    if addresses.is_empty() {
        errors.push(ValidationError::NoTargets);
    }
    for (index, address) in addresses.iter().enumerate() {
        if address.is_empty() {
            errors.push(ValidationError::EmptyAddress { index });
        } else if !has_port(address) {
            errors.push(ValidationError::MissingPort {
                address: address.clone(),
            });
        }
    }

    if config.health_check.cadence_seconds == 0 {
        errors.push(ValidationError::ZeroHealthCheckSetting {
            field: "cadenceSeconds",
        });
    }
    if config.health_check.timeout_seconds == 0 {
        errors.push(ValidationError::ZeroHealthCheckSetting {
            field: "timeoutSeconds",
        });
    }

    if config.timeouts.connect_seconds == Some(0) {
        errors.push(ValidationError::ZeroTimeout {
            field: "connectSeconds",
        });
    }
    if config.timeouts.relay_seconds == Some(0) {
        errors.push(ValidationError::ZeroTimeout {
            field: "relaySeconds",
        });
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    // Only the serving listener and, when enabled, the metrics exporter bind.
    let serving = match config.protocol {
        Protocol::Http => ("http", config.ports.http),
        Protocol::Tcp => ("tcp", config.ports.tcp),
    };
    // Port 0 asks the OS for an ephemeral port, so it never clashes.
    if config.observability.metrics_enabled
        && serving.1 == config.ports.metrics
        && serving.1 != 0
    {
        errors.push(ValidationError::PortConflict {
            first: serving.0,
            second: "metrics",
            port: serving.1,
        });
    }

    if config.bind_ip().is_err() {
        errors.push(ValidationError::InvalidHost(config.host.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` where the port is numeric. Bracketed IPv6 hosts are accepted.
fn has_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> LoadBalancerConfig {
        LoadBalancerConfig {
            addresses: "127.0.0.1:9001,backend.internal:9002".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn reports_all_errors_at_once() {
        let mut config = valid_config();
        config.addresses = "127.0.0.1:9001,,nohost".to_string();
        config.health_check.cadence_seconds = 0;
        config.ports.metrics = config.ports.http;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyAddress { index: 1 }));
        assert!(errors.contains(&ValidationError::MissingPort {
            address: "nohost".to_string()
        }));
        assert!(errors.contains(&ValidationError::ZeroHealthCheckSetting {
            field: "cadenceSeconds"
        }));
        assert!(errors.contains(&ValidationError::PortConflict {
            first: "http",
            second: "metrics",
            port: 80
        }));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn rejects_missing_targets() {
        let config = LoadBalancerConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoTargets]);
    }

    #[test]
    fn rejects_zero_timeouts_and_limits() {
        let mut config = valid_config();
        config.timeouts.relay_seconds = Some(0);
        config.listener.max_connections = 0;
        config.host = "localhost".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroTimeout {
                    field: "relaySeconds"
                },
                ValidationError::ZeroMaxConnections,
                ValidationError::InvalidHost("localhost".to_string()),
            ]
        );
    }

    #[test]
    fn only_bound_listeners_conflict() {
        let mut config = valid_config();
        // The TCP port is unused in HTTP mode.
        config.ports.tcp = config.ports.http;
        assert_eq!(validate_config(&config), Ok(()));

        config.protocol = Protocol::Tcp;
        config.ports.metrics = config.ports.tcp;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::PortConflict {
                first: "tcp",
                second: "metrics",
                port: 80
            }]
        );

        config.observability.metrics_enabled = false;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn accepts_ipv6_host() {
        let mut config = valid_config();
        config.host = "::1".to_string();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn port_detection() {
        assert!(has_port("10.0.0.1:80"));
        assert!(has_port("[::1]:8080"));
        assert!(!has_port("10.0.0.1"));
        assert!(!has_port(":80"));
        assert!(!has_port("host:http"));
    }
}
