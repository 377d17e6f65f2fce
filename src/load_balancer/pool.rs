//! Target pool and round-robin selection.
//!
//! # Responsibilities
//! - Own the fixed, ordered list of targets
//! - Rotate through targets with a shared counter, skipping unhealthy ones
//! - Bound every selection to one pass over the pool

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::load_balancer::target::Target;

/// Errors returned by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every target was checked once and none was healthy.
    #[error("pool has no healthy targets")]
    NoHealthyTargets,

    #[error("pool must contain at least one target")]
    Empty,
}

/// A fixed set of targets plus the round-robin counter.
///
/// The target list never changes after construction; only the counter and the
/// per-target health flags mutate.
#[derive(Debug)]
pub struct Pool {
    targets: Vec<Target>,
    /// Incremented once per selection attempt, shared by all callers.
    counter: AtomicU64,
}

impl Pool {
    /// Create a pool. Fails if `targets` is empty.
    pub fn new(targets: Vec<Target>) -> Result<Self, PoolError> {
        if targets.is_empty() {
            return Err(PoolError::Empty);
        }
        Ok(Self {
            targets,
            counter: AtomicU64::new(0),
        })
    }

    /// Build a pool from `host:port` strings, preserving their order.
    pub fn from_addresses<S: AsRef<str>>(addresses: &[S]) -> Result<Self, PoolError> {
        let targets = addresses
            .iter()
            .map(|address| {
                tracing::info!(backend = %address.as_ref(), "Parsed target");
                Target::new(address.as_ref())
            })
            .collect();
        Self::new(targets)
    }

    /// Select the next healthy target.
    ///
    /// Makes at most `len()` attempts. Each attempt consumes one counter slot,
    /// so an unhealthy target still advances the rotation.
    pub fn next(&self) -> Result<&Target, PoolError> {
        let len = self.targets.len() as u64;
        for _ in 0..len {
            let slot = self.counter.fetch_add(1, Ordering::Relaxed);
            let target = &self.targets[(slot % len) as usize];
            if target.is_healthy() {
                return Ok(target);
            }
        }

        tracing::debug!(target_count = len, "No healthy target found in pool");
        Err(PoolError::NoHealthyTargets)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Always false: a pool cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn healthy_count(&self) -> usize {
        self.targets.iter().filter(|t| t.is_healthy()).count()
    }

    /// Number of selection attempts made so far.
    pub fn selections(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}
