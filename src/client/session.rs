//! Client Session
//!
//! A [`Client`] is one session against the engine: fixed connection
//! settings, a channel chosen once, and the pool of sockets started in that
//! channel.
//!
//! ## Command Flow
//!
//! ```text
//! client.query(..)
//!       │
//!       ▼
//! ┌──────────────┐  refused: ClientError, no I/O
//! │ ChannelGate  │──────────────────────────────>
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐  bad token: ClientError, no I/O
//! │ check_token  │──────────────────────────────>
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │   encode()   │  "QUERY c b \"terms\" LIMIT(10)"
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ pool.acquire │  may wait for a free connection
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ write + read │  one line, or PENDING + EVENT
//! └──────┬───────┘
//!        ▼
//!   connection released, reply decoded by the caller
//! ```

use crate::channel::ChannelGate;
use crate::config::ClientConfig;
use crate::connection::ConnectionPool;
use crate::error::{ClientError, SonicResult};
use crate::protocol::{check_token, encode, escape, Channel, Command, Modifiers};
use std::sync::OnceLock;
use tracing::{debug, info};

/// An async session against a Sonic engine.
///
/// Methods take `&self`; share the client behind an `Arc` to run commands
/// from several tasks at once. Each command borrows its own pooled
/// connection for the duration of one request/reply exchange.
pub struct Client {
    config: ClientConfig,
    gate: ChannelGate,
    pool: OnceLock<ConnectionPool>,
}

impl Client {
    /// Creates an uninitialized session. No connection is made until
    /// [`channel`](Self::channel) is called.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            gate: ChannelGate::new(),
            pool: OnceLock::new(),
        }
    }

    /// Creates a session and starts it in `channel`.
    pub async fn create(config: ClientConfig, channel: Channel) -> SonicResult<Self> {
        let client = Self::new(config);
        client.channel(channel).await?;
        Ok(client)
    }

    /// Selects the session's channel and checks the engine is reachable.
    ///
    /// Fails with a client error when a channel is already set. The first
    /// connection is opened right away with a `PING`, so a wrong password
    /// surfaces here as a server error. The channel stays selected even if
    /// that check fails.
    pub async fn channel(&self, channel: Channel) -> SonicResult<()> {
        self.gate.set(channel)?;

        let pool = ConnectionPool::new(self.config.clone(), channel);
        if self.pool.set(pool).is_err() {
            return Err(ClientError::ChannelAlreadySet.into());
        }
        info!(
            addr = %self.config.address(),
            channel = %channel,
            max_connections = self.config.max_connections,
            "Channel selected"
        );

        self.execute(Command::Ping, &[], None, &Modifiers::default())
            .await
            .map(|_| ())
    }

    /// Current channel, `Uninitialized` until one is selected.
    pub fn mode(&self) -> Channel {
        self.gate.channel()
    }

    /// Settings this session was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session's pool, once a channel is selected.
    pub fn pool(&self) -> Option<&ConnectionPool> {
        self.pool.get()
    }

    /// Closes the session's pool. Later commands fail with
    /// `ConnectionClosed`.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }

    /// Single dispatch point for every command.
    ///
    /// Gate check, argument check, encode, acquire, exchange, release.
    /// `tokens` go out as bare arguments and must each be a single token;
    /// `text` is escaped and sent after them. Returns the raw authoritative
    /// reply line.
    pub(crate) async fn execute(
        &self,
        command: Command,
        tokens: &[&str],
        text: Option<&str>,
        modifiers: &Modifiers,
    ) -> SonicResult<String> {
        self.gate.check(command)?;
        let pool = self.pool.get().ok_or(ClientError::ChannelNotSet)?;

        tokens.iter().try_for_each(|token| check_token(token))?;
        modifiers.check()?;

        let text = text.map(escape);
        let mut args = tokens.to_vec();
        args.extend(text.as_deref());
        let line = encode(command, &args, modifiers);
        let mut conn = pool.acquire().await?;
        let reply = conn.execute(command, &line).await;

        if command == Command::Quit {
            // The engine ends the session after QUIT.
            conn.invalidate();
            pool.release(conn);
            pool.close().await;
            debug!(channel = %pool.channel(), "Session ended by QUIT");
        } else {
            pool.release(conn);
        }

        reply
    }

    /// Admits `command` without sending anything.
    pub(crate) fn check(&self, command: Command) -> Result<Channel, ClientError> {
        self.gate.check(command)
    }
}
