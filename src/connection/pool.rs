//! Connection Pool
//!
//! A bounded set of started connections shared by every command of a
//! session.
//!
//! ## Admission
//!
//! ```text
//!  acquire()
//!     │
//!     ▼
//!  closed? ──yes──> ConnectionClosed
//!     │
//!     ▼
//!  take a permit (FIFO wait once max_connections are in use)
//!     │
//!     ▼
//!  idle connection? ──yes──> hand it out
//!     │
//!     ▼
//!  connect + handshake a new one
//! ```
//!
//! A semaphore with `max_connections` permits bounds the sockets in use;
//! a new socket is only opened when the idle queue is empty, so idle plus
//! in-use never exceeds the bound either. The semaphore queues waiters in
//! arrival order.
//!
//! ## Release
//!
//! Dropping a [`PooledConnection`] puts the socket back on the idle queue
//! before its permit is returned, so the longest waiting acquirer gets that
//! same connection. Connections that saw an I/O, timeout or framing error
//! are discarded instead and their slot freed for a replacement.

use crate::config::ClientConfig;
use crate::connection::transport::Connection;
use crate::error::{ClientError, SonicResult};
use crate::protocol::{read_reply, Channel, Command};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Debug)]
struct PoolState {
    idle: VecDeque<Connection>,
    /// Sockets currently open: idle plus in use
    open: usize,
    closed: bool,
}

#[derive(Debug)]
struct PoolInner {
    config: ClientConfig,
    channel: Channel,
    permits: Arc<Semaphore>,
    state: Mutex<PoolState>,
    /// Connections ever created; never decreases
    created: AtomicU64,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // State is only moved in and out of the queue; a panic elsewhere
        // cannot leave it half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn return_connection(&self, conn: Connection, valid: bool) {
        let mut state = self.lock();
        if valid && !state.closed {
            state.idle.push_back(conn);
            return;
        }

        state.open = state.open.saturating_sub(1);
        drop(state);
        debug!(conn = conn.id(), valid, "Discarding connection");
    }

    fn release_slot(&self) {
        let mut state = self.lock();
        state.open = state.open.saturating_sub(1);
    }
}

/// Slot reserved for a connection that is still being opened.
struct SlotGuard<'a> {
    pool: &'a PoolInner,
    armed: bool,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.release_slot();
        }
    }
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates an empty pool; sockets are opened on demand.
    ///
    /// A `max_connections` of zero is treated as one.
    pub fn new(config: ClientConfig, channel: Channel) -> Self {
        let max = config.max_connections.max(1);
        Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(max)),
                state: Mutex::new(PoolState {
                    idle: VecDeque::with_capacity(max.min(64)),
                    open: 0,
                    closed: false,
                }),
                created: AtomicU64::new(0),
                config,
                channel,
            }),
        }
    }

    /// Acquires a connection, waiting when all of them are in use.
    pub async fn acquire(&self) -> SonicResult<PooledConnection> {
        if self.is_closed() {
            return Err(ClientError::ConnectionClosed.into());
        }

        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| ClientError::ConnectionClosed)?;

        {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(ClientError::ConnectionClosed.into());
            }
            if let Some(conn) = state.idle.pop_front() {
                return Ok(PooledConnection::new(self.inner.clone(), conn, permit));
            }
            state.open += 1;
        }

        // Frees the slot if connecting fails or this future is dropped.
        let mut slot = SlotGuard {
            pool: self.inner.as_ref(),
            armed: true,
        };
        let id = self.inner.created.fetch_add(1, Ordering::Relaxed) + 1;
        let conn = Connection::connect(id, &self.inner.config, self.inner.channel).await?;
        slot.armed = false;

        debug!(conn = id, channel = %self.inner.channel, "Created connection");
        Ok(PooledConnection::new(self.inner.clone(), conn, permit))
    }

    /// Returns a connection to the pool.
    ///
    /// Same as dropping it; provided for call sites that want the hand-back
    /// to be explicit.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Closes the pool.
    ///
    /// Blocked and future acquires fail with `ConnectionClosed`, idle sockets
    /// are shut down, and connections still in use are closed when released.
    /// Closing twice is a no-op.
    pub async fn close(&self) {
        let idle: Vec<Connection> = {
            let mut state = self.inner.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let idle: Vec<Connection> = state.idle.drain(..).collect();
            state.open = state.open.saturating_sub(idle.len());
            idle
        };
        self.inner.permits.close();

        debug!(channel = %self.inner.channel, idle = idle.len(), "Closing pool");
        for mut conn in idle {
            // Best effort: the socket is dropped right after either way.
            let _ = conn.shutdown().await;
        }
    }

    /// Returns true once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Channel every connection of this pool is started in.
    pub fn channel(&self) -> Channel {
        self.inner.channel
    }

    /// Configured upper bound on open sockets.
    pub fn max_connections(&self) -> usize {
        self.inner.config.max_connections.max(1)
    }

    /// Number of connections created so far, including discarded ones.
    pub fn created(&self) -> u64 {
        self.inner.created.load(Ordering::Relaxed)
    }

    /// Sockets currently open, idle or in use.
    pub fn open(&self) -> usize {
        self.inner.lock().open
    }

    /// Sockets waiting in the idle queue.
    pub fn idle(&self) -> usize {
        self.inner.lock().idle.len()
    }
}

/// RAII wrapper returning a connection to the pool on drop.
#[derive(Debug)]
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
    // Dropped after `Drop::drop` has queued the connection.
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection, permit: OwnedSemaphorePermit) -> Self {
        Self {
            pool,
            conn: Some(conn),
            valid: true,
            _permit: permit,
        }
    }

    /// Sends one command line and reads its reply.
    ///
    /// The connection counts as invalid for the whole exchange: if this
    /// future is dropped before the last reply line is read, the socket is
    /// discarded on release instead of being handed out mid-reply. A
    /// transport failure keeps it invalid; an `ERR` reply does not.
    pub async fn execute(&mut self, command: Command, line: &str) -> SonicResult<String> {
        let conn = self.conn.as_mut().ok_or(ClientError::ConnectionClosed)?;
        let was_valid = std::mem::replace(&mut self.valid, false);

        let result = match conn.write_line(line).await {
            Ok(()) => read_reply(command, conn).await,
            Err(err) => Err(err),
        };
        self.valid = was_valid
            && match &result {
                Ok(_) => true,
                Err(err) => !err.poisons_connection(),
            };
        result
    }

    /// Marks the connection unusable; it is closed on release.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Identifier of the underlying connection.
    pub fn id(&self) -> u64 {
        self.conn.as_ref().map_or(0, Connection::id)
    }

    /// Whether the connection will go back to the idle queue on release.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.return_connection(conn, self.valid);
        }
    }
}
