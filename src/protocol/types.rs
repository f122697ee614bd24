//! Sonic Channel Protocol Types
//!
//! The channel protocol is line based: every message is a single line of
//! UTF-8 text terminated with CRLF (`\r\n`).
//!
//! ## Session
//!
//! ```text
//! S: CONNECTED <sonic-server v1.4.9>
//! C: START search SecretPassword
//! S: STARTED search protocol(1) buffer(20000)
//! C: QUERY messages user:1 "valerian saliou" LIMIT(10)
//! S: PENDING Bt2m2gYa
//! S: EVENT QUERY Bt2m2gYa conversation:71f3d63b conversation:6501e83a
//! C: QUIT
//! S: ENDED quit
//! ```
//!
//! Any line starting with `ERR ` is a failure, whatever the command.

use std::fmt;

/// The CRLF terminator ending every line
pub const CRLF: &[u8] = b"\r\n";

/// Fixed tokens the engine starts its lines with
pub mod prefix {
    pub const CONNECTED: &str = "CONNECTED";
    pub const STARTED: &str = "STARTED";
    pub const ERR: &str = "ERR ";
    pub const RESULT: &str = "RESULT";
    pub const PENDING: &str = "PENDING";
    pub const EVENT: &str = "EVENT";
}

/// Capability class of a session.
///
/// A session starts `Uninitialized` and moves to exactly one of the other
/// three, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Uninitialized,
    Search,
    Ingest,
    Control,
}

impl Channel {
    /// Name used on the wire (`START <name> <password>`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Uninitialized => "uninitialized",
            Channel::Search => "search",
            Channel::Ingest => "ingest",
            Channel::Control => "control",
        }
    }

    /// Parses a selectable channel name, case-insensitively.
    pub fn parse(name: &str) -> Option<Channel> {
        match name.to_ascii_lowercase().as_str() {
            "search" => Some(Channel::Search),
            "ingest" => Some(Channel::Ingest),
            "control" => Some(Channel::Control),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every verb the driver can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Query,
    Suggest,
    Ping,
    Quit,
    Help,
    Push,
    Pop,
    Flushb,
    Flushc,
    Flusho,
    Count,
    Trigger,
    Info,
    List,
}

impl Command {
    /// All commands, in declaration order.
    pub const ALL: [Command; 14] = [
        Command::Query,
        Command::Suggest,
        Command::Ping,
        Command::Quit,
        Command::Help,
        Command::Push,
        Command::Pop,
        Command::Flushb,
        Command::Flushc,
        Command::Flusho,
        Command::Count,
        Command::Trigger,
        Command::Info,
        Command::List,
    ];

    /// The verb as written on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Query => "QUERY",
            Command::Suggest => "SUGGEST",
            Command::Ping => "PING",
            Command::Quit => "QUIT",
            Command::Help => "HELP",
            Command::Push => "PUSH",
            Command::Pop => "POP",
            Command::Flushb => "FLUSHB",
            Command::Flushc => "FLUSHC",
            Command::Flusho => "FLUSHO",
            Command::Count => "COUNT",
            Command::Trigger => "TRIGGER",
            Command::Info => "INFO",
            Command::List => "LIST",
        }
    }

    /// Looks a verb up by name, case-insensitively.
    pub fn parse(name: &str) -> Option<Command> {
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.as_str().eq_ignore_ascii_case(name))
    }

    /// Commands answered with `PENDING <marker>` first and the real
    /// `EVENT ...` line second.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Command::Query | Command::Suggest | Command::List)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative actions for `TRIGGER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Flush pending index writes and compact the store
    Consolidate,
    /// Back the store up into the given directory
    Backup(String),
    /// Restore the store from the given directory
    Restore(String),
}

impl Action {
    /// Tokens appended to `TRIGGER`.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            Action::Consolidate => vec!["consolidate"],
            Action::Backup(path) => vec!["backup", path.as_str()],
            Action::Restore(path) => vec!["restore", path.as_str()],
        }
    }
}

/// Parameters announced by the engine in its `STARTED` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerParams {
    /// Channel the engine acknowledged
    pub channel: String,
    /// `protocol(<ver>)`, if announced
    pub protocol: Option<u32>,
    /// `buffer(<size>)`, maximum line size in bytes, if announced
    pub buffer: Option<usize>,
}

impl ServerParams {
    /// Parses `STARTED <channel> protocol(<ver>) buffer(<size>)`.
    ///
    /// Returns `None` when the line is not a `STARTED` acknowledgement.
    pub fn parse(line: &str) -> Option<ServerParams> {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(prefix::STARTED) {
            return None;
        }
        let channel = tokens.next()?.to_string();

        let mut params = ServerParams {
            channel,
            protocol: None,
            buffer: None,
        };
        for token in tokens {
            if let Some((key, value)) = split_meta(token) {
                match key {
                    "protocol" => params.protocol = value.parse().ok(),
                    "buffer" => params.buffer = value.parse().ok(),
                    _ => {}
                }
            }
        }
        Some(params)
    }
}

/// Splits a `key(value)` token into its parts.
pub fn split_meta(token: &str) -> Option<(&str, &str)> {
    let (key, rest) = token.split_once('(')?;
    let value = rest.strip_suffix(')')?;
    Some((key, value))
}
