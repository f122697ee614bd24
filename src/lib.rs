//! # sonicwire - An Async Driver for the Sonic Search Engine
//!
//! sonicwire speaks Sonic's line-based channel protocol over TCP: it starts
//! authenticated sessions in one of the engine's channels (search, ingest,
//! control), encodes commands and decodes their replies, and keeps a
//! bounded pool of started sockets per session.
//!
//! ## Features
//!
//! - **Channel gating**: commands outside the session's channel fail before
//!   any I/O
//! - **Connection pooling**: sockets are created on demand up to a limit;
//!   extra callers wait in arrival order
//! - **Deferred replies**: `PENDING` / `EVENT` pairs are read as one reply
//! - **Large pushes**: oversized text is chunked to fit the engine's buffer
//! - **Async I/O**: Built on Tokio; commands from many tasks run concurrently
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Client                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │  Command    │───>│  Channel    │───>│   Codec     │                  │
//! │  │  methods    │    │  Gate       │    │  (encode)   │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │  Chunker    │    │              ConnectionPool                  │   │
//! │  │  (PUSH)     │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  └─────────────┘    │  │ Conn 1 │ │ Conn 2 │ │ Conn 3 │ │...max  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use sonicwire::{Channel, Client, ClientConfig, Modifiers};
//!
//! #[tokio::main]
//! async fn main() -> sonicwire::SonicResult<()> {
//!     let config = ClientConfig::from_env();
//!     let search = Client::create(config, Channel::Search).await?;
//!
//!     let ids = search
//!         .query("messages", "user:1", "valerian saliou", Modifiers::new().limit(10))
//!         .await?;
//!     println!("{:?}", ids);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Commands, channels, the codec and the chunker
//! - [`connection`]: Transport connection and connection pool
//! - [`channel`]: Per-session channel gate
//! - [`client`]: The session facade and per-command methods
//! - [`config`]: Connection settings
//! - [`error`]: Error types

pub mod channel;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;

// Re-export commonly used types for convenience
pub use client::Client;
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionPool, PooledConnection};
pub use error::{ClientError, SonicError, SonicResult};
pub use protocol::{Action, Channel, Command, Modifiers};

/// The default port Sonic's channel listens on
pub const DEFAULT_PORT: u16 = 1491;

/// The default engine host
pub const DEFAULT_HOST: &str = "localhost";

/// The engine's default channel password
pub const DEFAULT_PASSWORD: &str = "SecretPassword";

/// Version of sonicwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
