//! Timeout enforcement.
//!
//! # Responsibilities
//! - Optionally bound backend dials and relay passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - `None` means no deadline; the relay waits on its peers indefinitely
//! - Timed-out HTTP exchanges return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, error::Elapsed};

/// Await `future`, failing with `Elapsed` if `deadline` is set and passes first.
pub async fn with_deadline<F, T>(deadline: Option<Duration>, future: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    match deadline {
        Some(limit) => time::timeout(limit, future).await,
        None => Ok(future.await),
    }
}
