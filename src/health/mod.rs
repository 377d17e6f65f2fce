//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → Probe every target concurrently (TCP connect with timeout)
//!     → Write each target's health flag
//!     → Report healthy count to metrics
//! ```
//!
//! # Design Decisions
//! - A failed probe is steady-state behaviour, not an error
//! - One probe result decides the flag; there are no thresholds
//! - Health state is per-target, not per-pool

pub mod active;

pub use active::HealthMonitor;
