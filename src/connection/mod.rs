//! Connection Management
//!
//! This module owns the sockets a session talks to the engine through.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ConnectionPool                         │
//! │                                                             │
//! │   idle queue ──acquire()──> PooledConnection ──drop()──┐    │
//! │       ▲                            │                   │    │
//! │       └────────────────────────────┼───────────────────┘    │
//! │                                    ▼                        │
//! │                        ┌───────────────────────┐            │
//! │                        │      Connection       │            │
//! │                        │  handshake, write,    │            │
//! │                        │  read (ERR detection) │            │
//! │                        └───────────────────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Lazy creation**: sockets are opened and started on first demand
//! - **Bounded**: at most `max_connections` sockets, extra callers wait FIFO
//! - **Self-healing**: a connection that failed mid-exchange is discarded
//! - **Teardown**: closing the pool shuts idle sockets down

pub mod pool;
pub mod transport;

// Re-export commonly used types
pub use pool::{ConnectionPool, PooledConnection};
pub use transport::Connection;
