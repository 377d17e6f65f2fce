//! HTTP reverse-proxy mode.
//!
//! # Data Flow
//! ```text
//! Inbound request (any method, any path)
//!     → server.rs (Axum handler)
//!     → Pool::next() (503 if no target is healthy)
//!     → rewrite URI and Host to the target
//!     → hyper client, new connection per request
//!     → backend response streamed back unmodified
//! ```

pub mod server;

pub use server::HttpServer;
