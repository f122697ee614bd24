//! Channel Gate
//!
//! Every session picks its channel once. From then on only the commands of
//! that channel may run; everything else is refused before any socket is
//! touched.
//!
//! | Channel       | Commands                                                |
//! |---------------|---------------------------------------------------------|
//! | uninitialized | QUIT                                                    |
//! | search        | QUERY, SUGGEST, PING, HELP, QUIT, LIST                  |
//! | ingest        | PUSH, POP, COUNT, FLUSHB, FLUSHC, FLUSHO, PING, HELP, QUIT |
//! | control       | TRIGGER, PING, HELP, QUIT, INFO                         |

use crate::error::ClientError;
use crate::protocol::{Channel, Command};
use std::sync::OnceLock;

const UNINITIALIZED_COMMANDS: &[Command] = &[Command::Quit];

const SEARCH_COMMANDS: &[Command] = &[
    Command::Query,
    Command::Suggest,
    Command::Ping,
    Command::Help,
    Command::Quit,
    Command::List,
];

const INGEST_COMMANDS: &[Command] = &[
    Command::Push,
    Command::Pop,
    Command::Count,
    Command::Flushb,
    Command::Flushc,
    Command::Flusho,
    Command::Ping,
    Command::Help,
    Command::Quit,
];

const CONTROL_COMMANDS: &[Command] = &[
    Command::Trigger,
    Command::Ping,
    Command::Help,
    Command::Quit,
    Command::Info,
];

/// Commands a channel permits.
pub fn allowed_commands(channel: Channel) -> &'static [Command] {
    match channel {
        Channel::Uninitialized => UNINITIALIZED_COMMANDS,
        Channel::Search => SEARCH_COMMANDS,
        Channel::Ingest => INGEST_COMMANDS,
        Channel::Control => CONTROL_COMMANDS,
    }
}

/// Whether `command` may run in `channel`.
pub fn is_allowed(channel: Channel, command: Command) -> bool {
    allowed_commands(channel).contains(&command)
}

/// Per-session channel state: unset until [`set`](Self::set) succeeds once.
#[derive(Debug, Default)]
pub struct ChannelGate {
    channel: OnceLock<Channel>,
}

impl ChannelGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the session's channel. Fails if one is already selected.
    pub fn set(&self, channel: Channel) -> Result<(), ClientError> {
        if channel == Channel::Uninitialized {
            return Err(ClientError::InvalidChannel(channel));
        }
        self.channel
            .set(channel)
            .map_err(|_| ClientError::ChannelAlreadySet)
    }

    /// Current channel, `Uninitialized` until set.
    pub fn channel(&self) -> Channel {
        self.channel.get().copied().unwrap_or(Channel::Uninitialized)
    }

    /// Admits `command` or explains why not. Returns the session's channel.
    pub fn check(&self, command: Command) -> Result<Channel, ClientError> {
        let channel = match self.channel.get() {
            Some(channel) => *channel,
            None => return Err(ClientError::ChannelNotSet),
        };
        if !is_allowed(channel, command) {
            return Err(ClientError::CommandNotAllowed { command, channel });
        }
        Ok(channel)
    }
}
