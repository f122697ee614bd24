//! Sonic Channel Protocol
//!
//! This module implements the client side of Sonic's line-based channel
//! protocol.
//!
//! ## Overview
//!
//! Commands are single CRLF-terminated text lines; replies are single lines
//! too, except for the deferred `PENDING`/`EVENT` pair used by search
//! commands.
//!
//! ## Modules
//!
//! - `types`: Commands, channels, actions and the `STARTED` parameters
//! - `codec`: Command line encoding, text escaping and reply parsing
//! - `chunker`: Splits oversized `PUSH` text into wire-safe pieces
//!
//! ## Example
//!
//! ```
//! use sonicwire::protocol::{encode, escape, parse_results, Command, Modifiers};
//!
//! let terms = escape("quick fox");
//! let line = encode(Command::Query, &["messages", "user:1", &terms], &Modifiers::new().limit(10));
//! assert_eq!(line, "QUERY messages user:1 \"quick fox\" LIMIT(10)");
//!
//! let ids = parse_results(Command::Query, "EVENT QUERY Bt2m2gYa conv:1").unwrap();
//! assert_eq!(ids, vec!["conv:1"]);
//! ```

pub mod chunker;
pub mod codec;
pub mod types;

// Re-export commonly used types for convenience
pub use chunker::{chunk_text, Chunks, CHUNK_MARGIN, DEFAULT_BUFFER};
pub use codec::{
    check_token, encode, escape, parse_count, parse_info, parse_results, read_reply, Modifiers,
};
pub use types::{Action, Channel, Command, ServerParams, CRLF};
