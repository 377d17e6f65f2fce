//! TCP load balancing server.
//!
//! # Responsibilities
//! - Accept inbound connections on the bounded listener
//! - Spawn one relay task per connection
//! - Count accepted connections
//! - Stop accepting on shutdown and wait for in-flight relays

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::TimeoutConfig;
use crate::lifecycle::shutdown::DEFAULT_DRAIN_TIMEOUT;
use crate::load_balancer::Pool;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::tcp::relay::{relay_connection, RelayError};

/// Back-off after a failed accept, e.g. when out of file descriptors.
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(50);

pub struct TcpServer {
    pool: Arc<Pool>,
    timeouts: TimeoutConfig,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl TcpServer {
    pub fn new(pool: Arc<Pool>, timeouts: TimeoutConfig) -> Self {
        Self {
            pool,
            timeouts,
            tracker: ConnectionTracker::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Tracker of in-flight relays.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept and relay connections until shutdown is signalled.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(address = %addr, "Loadbalancing via tcp");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr, permit)) => {
                            metrics::record_tcp_connection();

                            let guard = self.tracker.track();
                            let pool = Arc::clone(&self.pool);
                            let timeouts = self.timeouts.clone();
                            tokio::spawn(async move {
                                let _permit = permit;
                                let connection_id = guard.id();
                                match relay_connection(&pool, stream, &timeouts).await {
                                    Ok(outcome) => tracing::debug!(
                                        connection_id = %connection_id,
                                        peer_addr = %peer_addr,
                                        backend = %outcome.target,
                                        sent = outcome.sent,
                                        received = outcome.received,
                                        "Relay complete"
                                    ),
                                    Err(RelayError::Pool(e)) => tracing::warn!(
                                        connection_id = %connection_id,
                                        peer_addr = %peer_addr,
                                        error = %e,
                                        "Error fetching next target"
                                    ),
                                    Err(e) => tracing::warn!(
                                        connection_id = %connection_id,
                                        peer_addr = %peer_addr,
                                        error = %e,
                                        "Relay aborted"
                                    ),
                                }
                                drop(guard);
                            });
                        }
                        Err(ListenerError::Accept(e)) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                        }
                        Err(e) => return Err(e),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("TCP server received shutdown signal, no longer accepting");
                    break;
                }
            }
        }

        let in_flight = self.tracker.active_count();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for in-flight relays");
            if tokio::time::timeout(self.drain_timeout, self.tracker.wait_for_idle())
                .await
                .is_err()
            {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain timeout reached, abandoning in-flight relays"
                );
            }
        }

        tracing::info!("TCP server stopped");
        Ok(())
    }
}
