//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher accepts a request/connection
//!     → pool.rs (shared counter picks the next slot)
//!     → target.rs (is this target healthy?)
//!         - yes: hand the target to the relay
//!         - no:  consume another slot, at most one full pass
//!     → Return target or NoHealthyTargets
//! ```
//!
//! # Design Decisions
//! - Target list is fixed at startup; only health flags and the counter mutate
//! - Each target guards its own flag; no pool-wide lock during selection
//! - Unhealthy targets consume rotation slots (round-robin over attempts)

pub mod pool;
pub mod target;

pub use pool::{Pool, PoolError};
pub use target::Target;
