//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Relay to backend:
//!     → timeouts.rs (optional connect / relay deadline)
//!     → On expiry: abort this connection only; no retry against another target
//! ```

pub mod timeouts;
