//! Target abstraction.
//!
//! # Responsibilities
//! - Represent a single backend endpoint
//! - Hold the health flag behind a per-target lock
//! - Probe the endpoint with a bounded TCP connect

use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;

/// A single backend endpoint.
#[derive(Debug)]
pub struct Target {
    /// `host:port` of the backend.
    address: String,
    /// Written by probes, read by selection.
    healthy: RwLock<bool>,
}

impl Target {
    /// Create a new target. Targets start unhealthy until their first probe succeeds.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            healthy: RwLock::new(false),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_healthy(&self) -> bool {
        *self.healthy.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the health flag, returning the previous value.
    pub fn set_healthy(&self, healthy: bool) -> bool {
        let mut flag = self.healthy.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *flag, healthy)
    }

    /// Attempt a TCP connection within `timeout` and record the outcome.
    ///
    /// The probe connection is dropped as soon as it is established. Returns the
    /// new health flag.
    pub async fn probe(&self, timeout: Duration) -> bool {
        let healthy = match time::timeout(timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(
                    backend = %self.address,
                    error = %e,
                    "Health probe failed: connection error"
                );
                false
            }
            Err(_) => {
                tracing::debug!(
                    backend = %self.address,
                    timeout = ?timeout,
                    "Health probe failed: timeout"
                );
                false
            }
        };

        let was_healthy = self.set_healthy(healthy);
        if was_healthy != healthy {
            if healthy {
                tracing::info!(backend = %self.address, "Target became healthy");
            } else {
                tracing::info!(backend = %self.address, "Target became unhealthy");
            }
        }
        healthy
    }
}
