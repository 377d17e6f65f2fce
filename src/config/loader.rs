//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::LoadBalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a file.
///
/// Files with a `.toml` extension are parsed as TOML, everything else as YAML.
pub fn load_config(path: &Path) -> Result<LoadBalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: LoadBalancerConfig = if is_toml(path) {
        toml::from_str(&content)?
    } else {
        parse_yaml(&content)?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_yaml(content: &str) -> Result<LoadBalancerConfig, serde_yaml::Error> {
    // An empty document is a null value to serde_yaml; treat it as all defaults.
    if content.trim().is_empty() {
        return Ok(LoadBalancerConfig::default());
    }
    serde_yaml::from_str(content)
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Protocol;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_yaml_file() {
        let file = write_temp(
            ".yaml",
            "addresses: \"127.0.0.1:9001\"\nprotocol: tcp\nhealthCheck:\n  cadenceSeconds: 1\n",
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.protocol, Protocol::Tcp);
        assert_eq!(config.health_check.cadence_seconds, 1);
    }

    #[test]
    fn loads_toml_file() {
        let file = write_temp(
            ".toml",
            "addresses = \"127.0.0.1:9001,127.0.0.1:9002\"\nprotocol = \"http\"\n\n[ports]\nhttp = 8080\n",
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.ports.http, 8080);
        assert_eq!(config.target_addresses().len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/loadbalancer.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let file = write_temp(".yaml", "addresses: [unterminated\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn empty_file_fails_validation() {
        let file = write_temp(".yaml", "");
        let err = load_config(file.path()).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::NoTargets]);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }
}
