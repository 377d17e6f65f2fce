//! TCP relay mode.
//!
//! # Data Flow
//! ```text
//! server.rs accepts a connection (one task per connection)
//!     → Pool::next() (closed immediately if no target is healthy)
//!     → relay.rs dials the target
//!     → one client→backend pass, one backend→client pass
//!     → both sockets closed
//! ```

pub mod relay;
pub mod server;

pub use relay::{relay_connection, RelayError, RelayOutcome};
pub use server::TcpServer;
