//! Client Facade
//!
//! [`Client`] is the entry point of the crate: a session bound to one
//! channel, a pool of connections started in it, and one method per
//! protocol command.
//!
//! ## Example
//!
//! ```no_run
//! use sonicwire::{Action, Channel, Client, ClientConfig, Modifiers};
//!
//! # async fn run() -> sonicwire::SonicResult<()> {
//! let config = ClientConfig::new("localhost", 1491).password("SecretPassword");
//!
//! let ingest = Client::create(config.clone(), Channel::Ingest).await?;
//! ingest.push("messages", "user:1", "conv:71", "The quick brown fox", None).await?;
//!
//! let control = Client::create(config.clone(), Channel::Control).await?;
//! control.trigger(Some(&Action::Consolidate)).await?;
//!
//! let search = Client::create(config, Channel::Search).await?;
//! let ids = search.query("messages", "user:1", "quick", Modifiers::new().limit(10)).await?;
//! assert_eq!(ids, vec!["conv:71"]);
//! # Ok(())
//! # }
//! ```

mod commands;
pub mod session;

pub use session::Client;
