//! Round-robin load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                LOAD BALANCER                 │
//!                        │                                              │
//!    Client request      │  ┌────────────┐      ┌────────────────────┐  │
//!    ────────────────────┼─▶│ http / tcp │─────▶│ load_balancer::Pool│  │
//!                        │  │  server    │      │  round-robin next()│  │
//!                        │  └─────┬──────┘      └─────────┬──────────┘  │
//!                        │        │                       │ flags       │
//!                        │        ▼                       │             │
//!    Client response     │  ┌────────────┐      ┌─────────┴──────────┐  │
//!    ◀───────────────────┼──│   relay    │◀────▶│  health monitor    │  │      Backend
//!                        │  │ (proxy /   │──────┼────────────────────┼──┼────▶ targets
//!                        │  │ one pass)  │      │  periodic probes   │  │
//!                        │  └────────────┘      └────────────────────┘  │
//!                        │                                              │
//!                        │  config · observability · lifecycle          │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use loadbalancer::config::{load_config, Protocol};
use loadbalancer::lifecycle::startup;
use loadbalancer::observability::logging;

#[derive(Parser)]
#[command(name = "loadbalancer")]
#[command(
    about = "Round-robin HTTP/TCP load balancer with active health checks",
    long_about = None
)]
struct Cli {
    /// Config file path (YAML, or TOML with a .toml extension).
    #[arg(short, long, default_value = "/opt/loadbalancer/config.yaml")]
    config: PathBuf,

    /// Serving mode; overrides the config file.
    #[arg(short, long, value_enum)]
    protocol: Option<Protocol>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config from {}: {}", cli.config.display(), e);
            return Err(e.into());
        }
    };
    if let Some(protocol) = cli.protocol {
        config.protocol = protocol;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!(
        protocol = %config.protocol,
        targets = %config.addresses,
        cadence_secs = config.health_check.cadence_seconds,
        timeout_secs = config.health_check.timeout_seconds,
        "Configuration loaded"
    );

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "Load balancer failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
