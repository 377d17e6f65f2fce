//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LoadBalancerConfig (validated, immutable)
//!     → consumed once at startup to build the pool, health monitor and listener
//! ```
//!
//! # Design Decisions
//! - Loaded once; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    HealthCheckConfig, ListenerConfig, LoadBalancerConfig, ObservabilityConfig, PortsConfig,
    Protocol, TimeoutConfig,
};
pub use validation::ValidationError;
