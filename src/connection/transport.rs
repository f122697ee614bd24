//! Transport Connection
//!
//! One socket to the engine, started in a fixed channel.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. TCP connect
//!        │
//!        ▼
//! 2. S: CONNECTED <banner>        (anything else is a protocol violation)
//!        │
//!        ▼
//! 3. C: START <channel> <password>
//!        │
//!        ▼
//! 4. S: STARTED <channel> protocol(1) buffer(20000)   or   ERR <reason>
//!        │
//!        ▼
//! 5. ┌──────────────────────────────┐
//!    │  write one command line      │
//!    │  read one (or two) replies   │  strictly alternating,
//!    │  [loop]                      │  no pipelining
//!    └──────────────────────────────┘
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut`; each complete CRLF line is
//! split off the front. A reply may arrive in pieces, or two replies
//! (`PENDING` + `EVENT`) may arrive in one read.

use crate::config::ClientConfig;
use crate::error::{SonicError, SonicResult};
use crate::protocol::types::{prefix, Channel, ServerParams, CRLF};
use bytes::BytesMut;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Longest line accepted from the engine (1 MB)
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// A started channel connection.
///
/// Generic over the stream so the framing can be driven by in-memory I/O;
/// pooled connections are always `Connection<TcpStream>`.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    /// Pool-assigned identifier (for logging and reuse checks)
    id: u64,

    /// The stream, writes buffered until flushed per line
    stream: BufWriter<S>,

    /// Bytes received but not yet consumed as lines
    buffer: BytesMut,

    /// Channel requested in `START`
    channel: Channel,

    /// What the engine announced in `STARTED`
    params: Option<ServerParams>,

    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl Connection<TcpStream> {
    /// Opens a socket to the configured engine and starts `channel` on it.
    pub async fn connect(id: u64, config: &ClientConfig, channel: Channel) -> SonicResult<Self> {
        let addr = config.address();
        debug!(conn = id, addr = %addr, channel = %channel, "Connecting");

        let stream = with_timeout(config.connect_timeout, async {
            Ok(TcpStream::connect(&addr).await?)
        })
        .await?;
        // Disable Nagle; every request is a single small line.
        stream.set_nodelay(true)?;

        let mut conn = Connection::new(id, stream, channel, config);
        conn.handshake(&config.password).await?;
        Ok(conn)
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already connected stream. Call [`handshake`](Self::handshake)
    /// before issuing commands.
    pub fn new(id: u64, stream: S, channel: Channel, config: &ClientConfig) -> Self {
        Self {
            id,
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            channel,
            params: None,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }

    /// Runs the `CONNECTED` / `START` / `STARTED` exchange.
    pub async fn handshake(&mut self, password: &str) -> SonicResult<ServerParams> {
        let banner = self.read_line().await?;
        if !banner.starts_with(prefix::CONNECTED) {
            return Err(SonicError::Protocol(format!(
                "expected CONNECTED banner, got {:?}",
                banner
            )));
        }

        trace!(conn = self.id, "Sending: START {} ****", self.channel);
        let start = format!("START {} {}", self.channel, password);
        self.send_frame(&start).await?;

        let ack = self.read_line().await?;
        let params = ServerParams::parse(&ack).ok_or_else(|| {
            SonicError::Protocol(format!("expected STARTED acknowledgement, got {:?}", ack))
        })?;

        debug!(
            conn = self.id,
            channel = %params.channel,
            protocol = ?params.protocol,
            buffer = ?params.buffer,
            "Channel started"
        );
        self.params = Some(params.clone());
        Ok(params)
    }

    /// Writes one command line, appends CRLF and flushes.
    pub async fn write_line(&mut self, line: &str) -> SonicResult<()> {
        trace!(conn = self.id, "Sending: {}", line);
        self.send_frame(line).await
    }

    /// Reads one line with its CRLF stripped.
    ///
    /// A line starting with `ERR ` becomes [`SonicError::Server`] holding the
    /// rest of the line.
    pub async fn read_line(&mut self) -> SonicResult<String> {
        loop {
            if let Some(line) = self.try_take_line()? {
                trace!(conn = self.id, "Received: {}", line);
                if let Some(reason) = line.strip_prefix(prefix::ERR) {
                    return Err(SonicError::Server(reason.to_string()));
                }
                return Ok(line);
            }

            with_timeout(self.read_timeout, self.read_more_data()).await?;
        }
    }

    /// Closes the write side of the socket.
    pub async fn shutdown(&mut self) -> SonicResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Pool-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Channel this connection was started in.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Parameters announced by the engine, once the handshake completed.
    pub fn server_params(&self) -> Option<&ServerParams> {
        self.params.as_ref()
    }

    async fn send_frame(&mut self, line: &str) -> SonicResult<()> {
        let stream = &mut self.stream;
        with_timeout(self.write_timeout, async move {
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(CRLF).await?;
            stream.flush().await?;
            Ok(())
        })
        .await
    }

    /// Splits one complete line off the buffer, if there is one.
    fn try_take_line(&mut self) -> SonicResult<Option<String>> {
        let pos = match find_crlf(&self.buffer) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let frame = self.buffer.split_to(pos + 2);
        let line = std::str::from_utf8(&frame[..pos])
            .map_err(|e| SonicError::Protocol(format!("invalid UTF-8 in reply: {}", e)))?;
        Ok(Some(line.trim().to_string()))
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> SonicResult<()> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            return Err(SonicError::Protocol(format!(
                "reply line exceeds {} bytes",
                MAX_BUFFER_SIZE
            )));
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(SonicError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "engine closed the connection",
            )));
        }

        trace!(conn = self.id, bytes = n, "Read data");
        Ok(())
    }
}

/// Runs `fut`, failing with [`SonicError::Timeout`] if `limit` elapses first.
async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> SonicResult<T>
where
    F: Future<Output = SonicResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| SonicError::Timeout(limit))?,
        None => fut.await,
    }
}

/// Finds the position of CRLF in the buffer.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
