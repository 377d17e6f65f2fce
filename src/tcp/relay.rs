//! Single-pass TCP relay.
//!
//! # Responsibilities
//! - Pick a target from the pool and dial it
//! - Forward one read from the client to the backend
//! - Forward one read from the backend to the client
//!
//! # Design Decisions
//! - Exactly one read/write pass per direction, then both sockets close.
//!   Supports one-shot request/response protocols only; this is not a
//!   streaming tunnel.
//! - Errors abort only the current connection and are never retried

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::TimeoutConfig;
use crate::load_balancer::{Pool, PoolError};
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

/// Size of the single read performed in each direction.
pub const BUFFER_SIZE: usize = 4096;

/// Which leg of the relay a pass moves bytes along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    fn source(self) -> &'static str {
        match self {
            Direction::ClientToBackend => "client",
            Direction::BackendToClient => "backend",
        }
    }

    fn dest(self) -> &'static str {
        match self {
            Direction::ClientToBackend => "backend",
            Direction::BackendToClient => "client",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source(), self.dest())
    }
}

/// Errors that abort a relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to connect to {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("timed out connecting to {target}")]
    DialTimeout { target: String },

    #[error("read from {} failed during {direction}: {source}", .direction.source())]
    Read {
        direction: Direction,
        #[source]
        source: io::Error,
    },

    #[error("write to {} failed during {direction}: {source}", .direction.dest())]
    Write {
        direction: Direction,
        #[source]
        source: io::Error,
    },

    #[error("{} closed before sending data", .direction.source())]
    PeerClosed { direction: Direction },

    #[error("{direction} pass timed out")]
    Timeout { direction: Direction },
}

/// Bytes moved by a completed relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub target: String,
    pub sent: usize,
    pub received: usize,
}

/// Relay one client connection through the next healthy target.
///
/// The client and backend streams are dropped, and therefore closed, when
/// this returns, whichever step failed.
pub async fn relay_connection(
    pool: &Pool,
    mut client: TcpStream,
    timeouts: &TimeoutConfig,
) -> Result<RelayOutcome, RelayError> {
    let target = pool.next()?;

    let mut backend = dial(target.address(), timeouts.connect())
        .await
        .inspect_err(|_| metrics::record_backend_dial_error())?;

    tracing::debug!(backend = %target.address(), "Loadbalancing to target");

    let relay_deadline = timeouts.relay();
    let sent = relay_pass(
        &mut client,
        &mut backend,
        Direction::ClientToBackend,
        relay_deadline,
    )
    .await?;
    let received = relay_pass(
        &mut backend,
        &mut client,
        Direction::BackendToClient,
        relay_deadline,
    )
    .await?;

    Ok(RelayOutcome {
        target: target.address().to_string(),
        sent,
        received,
    })
}

async fn dial(address: &str, deadline: Option<Duration>) -> Result<TcpStream, RelayError> {
    match with_deadline(deadline, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(RelayError::Dial {
            target: address.to_string(),
            source,
        }),
        Err(_) => Err(RelayError::DialTimeout {
            target: address.to_string(),
        }),
    }
}

/// One read from `source` followed by one write of those bytes to `dest`.
pub async fn relay_pass<R, W>(
    source: &mut R,
    dest: &mut W,
    direction: Direction,
    deadline: Option<Duration>,
) -> Result<usize, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    with_deadline(deadline, copy_once(source, dest, direction))
        .await
        .map_err(|_| RelayError::Timeout { direction })?
}

async fn copy_once<R, W>(
    source: &mut R,
    dest: &mut W,
    direction: Direction,
) -> Result<usize, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = [0u8; BUFFER_SIZE];
    let n = source
        .read(&mut buffer)
        .await
        .map_err(|source| RelayError::Read { direction, source })?;
    if n == 0 {
        return Err(RelayError::PeerClosed { direction });
    }

    dest.write_all(&buffer[..n])
        .await
        .map_err(|source| RelayError::Write { direction, source })?;
    dest.flush()
        .await
        .map_err(|source| RelayError::Write { direction, source })?;

    tracing::trace!(%direction, bytes = n, "Relayed data");
    Ok(n)
}
