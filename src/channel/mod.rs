//! Channel Capability Gate
//!
//! A session's channel (search, ingest or control) is chosen once and
//! decides which commands it may issue. The check is a lookup in static
//! tables done at the single dispatch point, before a connection is taken
//! from the pool.

pub mod gate;

pub use gate::{allowed_commands, is_allowed, ChannelGate};
