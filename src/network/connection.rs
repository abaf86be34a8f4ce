//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::dispatch::Dispatcher;
use crate::error::{Result, VhostError};
use crate::protocol::{read_message, write_message, Message, RequestCode};

/// Lifecycle of a connection worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    Closed,
}

/// Why a connection closed without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the stream on a message boundary
    PeerClosed,

    /// Peer closed the stream part-way through a message
    ShortRead { received: usize },

    /// Peer reset or aborted the connection
    PeerReset,

    /// Read timed out (only with a read timeout configured)
    Idle,
}

/// Handles a single client connection
pub struct Connection {
    /// Socket reader (buffered for efficiency)
    reader: BufReader<UnixStream>,

    /// Socket writer (buffered for efficiency)
    writer: BufWriter<UnixStream>,

    dispatcher: Dispatcher,

    state: ConnectionState,

    /// Label for logging
    peer: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// The stream is put in blocking mode: a worker waits for whole messages.
    pub fn new(stream: UnixStream, dispatcher: Dispatcher, id: u64) -> Result<Self> {
        stream.set_nonblocking(false)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            dispatcher,
            state: ConnectionState::Active,
            peer: format!("conn-{}", id),
        })
    }

    /// Configure connection timeouts (0 leaves the direction blocking)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends one reply per request, in order.
    /// Returns when the client disconnects or an error occurs; the
    /// connection is `Closed` on every return path.
    pub fn handle(&mut self) -> Result<CloseReason> {
        tracing::debug!("Client {} connected", self.peer);

        loop {
            let request = match read_message(&mut self.reader) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer);
                    return Ok(self.close(CloseReason::PeerClosed));
                }
                Err(VhostError::Framing { actual, .. }) => {
                    tracing::warn!(
                        "Client {} sent a truncated message ({} bytes), closing",
                        self.peer,
                        actual
                    );
                    return Ok(self.close(CloseReason::ShortRead { received: actual }));
                }
                Err(VhostError::Transport(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer);
                    return Ok(self.close(CloseReason::Idle));
                }
                Err(VhostError::Transport(ref e))
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("Connection reset by client {}", self.peer);
                    return Ok(self.close(CloseReason::PeerReset));
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer, e);
                    self.state = ConnectionState::Closed;
                    return Err(e);
                }
            };

            let reply = self.dispatcher.dispatch(&request);
            self.observe(&request, &reply);

            if let Err(e) = write_message(&mut self.writer, &reply) {
                self.state = ConnectionState::Closed;
                return Err(e);
            }
        }
    }

    /// Report one exchange
    fn observe(&self, request: &Message, reply: &Message) {
        tracing::info!(
            "{}: received request {} (flags={:#x}, size={})",
            self.peer,
            request.request_name(),
            request.flags,
            request.size
        );

        match request.request_code() {
            Some(RequestCode::GetFeatures) | Some(RequestCode::GetProtocolFeatures) => {
                tracing::info!(
                    "{}: sending {} reply: {:#x}",
                    self.peer,
                    reply.request_name(),
                    reply.payload.as_u64()
                );
            }
            Some(RequestCode::SetFeatures) | Some(RequestCode::SetProtocolFeatures) => {
                tracing::info!(
                    "{}: {}: {:#x}",
                    self.peer,
                    request.request_name(),
                    request.payload.as_u64()
                );
            }
            Some(RequestCode::SetOwner) => {
                tracing::info!("{}: SET_OWNER", self.peer);
            }
            _ => {
                tracing::info!("{}: unhandled request {}", self.peer, request.request);
            }
        }
    }

    fn close(&mut self, reason: CloseReason) -> CloseReason {
        self.state = ConnectionState::Closed;
        reason
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the peer label
    pub fn peer(&self) -> &str {
        &self.peer
    }
}
