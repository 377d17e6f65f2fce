//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the pool from validated configuration
//! - Start background tasks (metrics exporter, health monitor)
//! - Bind the listener for the selected protocol and serve until signalled
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - One health cycle completes before the listener binds, so healthy targets
//!   are routable from the first request
//! - Shutdown waits for the health monitor and for the server's bounded drain

use std::future::Future;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::{LoadBalancerConfig, Protocol};
use crate::health::HealthMonitor;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{Pool, PoolError};
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;
use crate::tcp::TcpServer;

/// Fatal startup or serving errors.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid pool: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid host '{host}': {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("HTTP server error: {0}")]
    Http(#[from] std::io::Error),
}

/// Run the load balancer until SIGINT/SIGTERM.
pub async fn run(config: LoadBalancerConfig) -> Result<(), StartupError> {
    run_until(config, crate::lifecycle::signals::wait_for_signal()).await
}

/// Run the load balancer until `stop` resolves.
pub async fn run_until<F>(config: LoadBalancerConfig, stop: F) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    let invalid_host = |source| StartupError::InvalidHost {
        host: config.host.clone(),
        source,
    };

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.metrics_bind_address().map_err(invalid_host)?)?;
    }

    let pool = Arc::new(Pool::from_addresses(&config.target_addresses())?);
    metrics::set_num_targets(pool.len());

    let bind_address = config.serving_bind_address().map_err(invalid_host)?;

    let shutdown = Shutdown::new();

    let monitor = HealthMonitor::new(Arc::clone(&pool), config.health_check.clone());
    monitor.check_all().await;
    let health_task = tokio::spawn(monitor.run_after_first_cycle(shutdown.subscribe()));

    let server = serve(&config, pool, bind_address, shutdown.subscribe());
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        _ = stop => {
            shutdown.trigger();
            server.await
        }
    };

    // Covers the case where the server exited on its own.
    shutdown.trigger();
    if let Err(e) = health_task.await {
        tracing::error!(error = %e, "Health monitor task failed");
    }

    result
}

async fn serve(
    config: &LoadBalancerConfig,
    pool: Arc<Pool>,
    bind_address: SocketAddr,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), StartupError> {
    let drain_timeout = config.listener.drain_timeout();
    match config.protocol {
        Protocol::Http => {
            let listener = TcpListener::bind(bind_address)
                .await
                .map_err(|source| ListenerError::Bind {
                    address: bind_address.to_string(),
                    source,
                })?;
            HttpServer::new(pool, &config.timeouts)
                .with_drain_timeout(drain_timeout)
                .run(listener, shutdown)
                .await?;
        }
        Protocol::Tcp => {
            let listener =
                Listener::bind(&bind_address.to_string(), config.listener.max_connections).await?;
            TcpServer::new(pool, config.timeouts.clone())
                .with_drain_timeout(drain_timeout)
                .run(listener, shutdown)
                .await?;
        }
    }
    Ok(())
}
