//! Connection Handler
//!
//! Each accepted client gets its own async task running the loop below.
//! TCP is a stream, so a single read may carry a partial frame or several
//! frames; a `BytesMut` buffer accumulates incoming bytes and the frame
//! decoder pulls complete requests off the front.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │      Connection loop         │
//! │                              │
//! │  read bytes from socket      │
//! │        │                     │
//! │        ▼                     │
//! │  decode frame ───────────────┼── malformed frame: close connection
//! │        │                     │
//! │        ▼                     │
//! │  parse command ──────────────┼── bad command: -ERR reply, keep going
//! │        │                     │
//! │        ▼                     │
//! │  execute against engine      │
//! │        │                     │
//! │        ▼                     │
//! │  send reply, loop            │
//! └──────────────────────────────┘
//! ```
//!
//! One request, one reply, in order. The engine imposes no timeouts;
//! request deadlines belong to clients.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

use crate::commands::CommandHandler;
use crate::protocol::{parse_command, FrameDecoder, FrameError, Response};

/// Initial capacity of the per-connection read buffer.
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Slack on top of `max_value_bytes` for the command name, key, and TTL
/// argument inside a frame payload.
pub const COMMAND_OVERHEAD_BYTES: usize = 1024;

/// Counters shared by all connections.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted.
    pub connections_accepted: AtomicU64,
    /// Currently active connections.
    pub active_connections: AtomicU64,
    /// Total commands processed.
    pub commands_processed: AtomicU64,
    /// Total bytes read from clients.
    pub bytes_read: AtomicU64,
    /// Total bytes written to clients.
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Network failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrecoverable framing violation.
    #[error("protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// Client closed the connection between requests.
    #[error("client disconnected")]
    ClientDisconnected,

    /// Stream ended in the middle of a frame.
    #[error("unexpected end of stream")]
    UnexpectedEof,
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    buffer: BytesMut,
    decoder: FrameDecoder,
    /// Hard cap on buffered request bytes: one maximal frame plus header.
    max_buffered: usize,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a handler for an accepted stream.
    ///
    /// `max_payload_bytes` bounds a single frame payload; derive it from
    /// the configured `max_value_bytes` plus [`COMMAND_OVERHEAD_BYTES`].
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        commands: CommandHandler,
        stats: Arc<ConnectionStats>,
        max_payload_bytes: usize,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            decoder: FrameDecoder::new(max_payload_bytes),
            max_buffered: max_payload_bytes + 32,
            commands,
            stats,
        }
    }

    /// Runs the request loop until the client disconnects or the stream
    /// breaks.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "client disconnected"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "client disconnected")
            }
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "connection closed on error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(payload) = self.try_decode_frame()? {
                let response = match parse_command(&payload) {
                    Ok(command) => self.commands.execute(command),
                    // Command-level problems answer with -ERR and keep
                    // the connection; only framing kills it.
                    Err(e) => Response::error(e),
                };
                self.stats.command_processed();
                self.send_response(&response).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Pulls one complete frame payload off the buffer, if available.
    fn try_decode_frame(&mut self) -> Result<Option<Bytes>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.decoder.decode(&self.buffer) {
            Ok(Some((payload, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed,
                    remaining = self.buffer.len(),
                    "decoded frame"
                );
                Ok(Some(payload))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(client = %self.addr, error = %e, "malformed frame");
                Err(e.into())
            }
        }
    }

    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        // An over-full buffer without a decodable frame means the peer
        // exceeded the frame ceiling; the decoder reports the precise
        // error on the next decode, so only guard against growth here.
        if self.buffer.len() >= self.max_buffered {
            error!(
                client = %self.addr,
                buffered = self.buffer.len(),
                "request buffer limit exceeded"
            );
            return Err(FrameError::FrameTooLarge {
                size: self.buffer.len(),
                max: self.max_buffered,
            }
            .into());
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            }
            // Partial frame left behind.
            return Err(ConnectionError::UnexpectedEof);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "read data");
        Ok(())
    }

    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        Ok(())
    }
}

/// Creates a handler for the connection and runs it to completion,
/// swallowing the expected disconnect errors.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
    max_payload_bytes: usize,
) {
    let handler = ConnectionHandler::new(stream, addr, commands, stats, max_payload_bytes);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "connection ended with error");
            }
        }
    }
}
