//! Error Types
//!
//! Every failure a command can surface, split the way the protocol splits
//! blame:
//!
//! - [`ClientError`]: the caller misused the session (channel set twice,
//!   command issued before a channel was chosen, command not allowed in the
//!   chosen channel, unusable argument, pool already closed). No network
//!   I/O happens.
//! - [`SonicError::Server`]: the engine answered with an `ERR <reason>` line.
//! - Everything else is transport trouble: I/O, timeouts, handshake
//!   violations and replies whose shape does not match the command.

use crate::protocol::{Channel, Command};
use std::time::Duration;
use thiserror::Error;

/// Caller misuse, detected before anything is written to a socket.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// `channel()` was called on a session whose channel is already set.
    #[error("channel cannot be set twice")]
    ChannelAlreadySet,

    /// A command was issued while the session is still uninitialized.
    #[error("call channel-set before issuing commands")]
    ChannelNotSet,

    /// `Channel::Uninitialized` is a starting state, not a selectable channel.
    #[error("cannot select the {0} channel")]
    InvalidChannel(Channel),

    /// The command is gated off for this session's channel.
    #[error("command {command} not available in {channel} channel")]
    CommandNotAllowed { command: Command, channel: Channel },

    /// The pool was closed (explicitly or by QUIT).
    #[error("connection closed")]
    ConnectionClosed,

    /// PUSH was given text that is empty once trimmed.
    #[error("nothing to push: text is empty")]
    EmptyText,

    /// A collection, bucket, object or other bare argument would not travel
    /// as a single token (whitespace, control character or quote).
    #[error("invalid argument {0:?}: must be a single token")]
    InvalidToken(String),
}

/// Errors returned by every driver operation.
#[derive(Debug, Error)]
pub enum SonicError {
    /// Caller misuse
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// The engine replied with `ERR <reason>`; holds the reason
    #[error("server error: {0}")]
    Server(String),

    /// Network failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Handshake violation, undecodable bytes or unexpected EOF
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The reply was not `ERR` but does not have the shape the command expects
    #[error("malformed response to {command}: {line:?}")]
    MalformedResponse { command: Command, line: String },

    /// A connect, read or write did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl SonicError {
    /// Shorthand for a malformed reply to `command`.
    pub fn malformed(command: Command, line: impl Into<String>) -> Self {
        SonicError::MalformedResponse {
            command,
            line: line.into(),
        }
    }

    /// Returns true for caller-side misuse, including a closed pool.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SonicError::Client(_))
    }

    /// Returns true when the pool had already been closed.
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, SonicError::Client(ClientError::ConnectionClosed))
    }

    /// Returns true when the engine answered with an `ERR` line.
    pub fn is_server_error(&self) -> bool {
        matches!(self, SonicError::Server(_))
    }

    /// Whether a connection that produced this error must not be reused.
    ///
    /// An `ERR` reply leaves the session in a known state; anything that
    /// breaks framing or the socket does not.
    pub fn poisons_connection(&self) -> bool {
        matches!(
            self,
            SonicError::Io(_)
                | SonicError::Protocol(_)
                | SonicError::MalformedResponse { .. }
                | SonicError::Timeout(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type SonicResult<T> = Result<T, SonicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_closed_is_client_error() {
        let err = SonicError::from(ClientError::ConnectionClosed);
        assert!(err.is_client_error());
        assert!(err.is_connection_closed());
        assert!(!err.poisons_connection());
    }

    #[test]
    fn test_server_error_keeps_connection() {
        let err = SonicError::Server("invalid_meta_value(LIMIT(0))".to_string());
        assert!(err.is_server_error());
        assert!(!err.poisons_connection());
        assert_eq!(err.to_string(), "server error: invalid_meta_value(LIMIT(0))");
    }

    #[test]
    fn test_transport_errors_poison() {
        let io = SonicError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(io.poisons_connection());
        assert!(SonicError::Timeout(Duration::from_secs(1)).poisons_connection());
        assert!(SonicError::malformed(Command::Count, "RESULT x").poisons_connection());
    }

    #[test]
    fn test_display_messages() {
        let err = ClientError::CommandNotAllowed {
            command: Command::Push,
            channel: Channel::Search,
        };
        assert_eq!(err.to_string(), "command PUSH not available in search channel");
        assert_eq!(
            ClientError::ChannelNotSet.to_string(),
            "call channel-set before issuing commands"
        );
    }
}
