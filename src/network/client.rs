//! Client
//!
//! Synchronous request/reply client for the emulator (or any vhost-user
//! backend that answers the feature queries).

use std::io::{BufReader, BufWriter};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, VhostError};
use crate::protocol::{read_message, write_message, Message, RequestCode, MESSAGE_SIZE};

/// Socket path the client binary uses when none is given
pub const DEFAULT_CLIENT_SOCKET_PATH: &str = "/tmp/vhost-user-sock";

/// Replies collected by [`Client::handshake`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub features: Message,
    pub protocol_features: Message,
}

/// A connection to a vhost-user server
pub struct Client {
    reader: BufReader<UnixStream>,
    writer: BufWriter<UnixStream>,
    path: PathBuf,
}

impl Client {
    /// Connect to the server at `path`
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = UnixStream::connect(&path).map_err(|e| {
            VhostError::Connect(format!("cannot connect to {}: {}", path.display(), e))
        })?;

        let read_stream = stream.try_clone()?;
        tracing::debug!("Connected to {}", path.display());

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            path,
        })
    }

    /// Configure timeouts (0 leaves the direction blocking)
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

    /// Path this client is connected to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Send one message without waiting for a reply
    pub fn send(&mut self, message: &Message) -> Result<()> {
        write_message(&mut self.writer, message)
    }

    /// Receive exactly one message
    ///
    /// A stream that ends before a full message arrives is a framing error,
    /// including one that ends before any byte arrives.
    pub fn recv(&mut self) -> Result<Message> {
        read_message(&mut self.reader)?.ok_or(VhostError::Framing {
            expected: MESSAGE_SIZE,
            actual: 0,
        })
    }

    /// Send `message` and wait for its reply
    ///
    /// The reply must echo the request code.
    pub fn request(&mut self, message: &Message) -> Result<Message> {
        self.send(message)?;
        let reply = self.recv()?;

        if reply.request != message.request {
            return Err(VhostError::UnexpectedReply {
                expected: message.request,
                actual: reply.request,
            });
        }

        tracing::debug!(
            "{} -> size={}, payload={:#x}",
            reply.request_name(),
            reply.size,
            reply.payload.as_u64()
        );
        Ok(reply)
    }

    /// Query the feature bitmask
    pub fn get_features(&mut self) -> Result<u64> {
        let reply = self.request(&Message::request(RequestCode::GetFeatures))?;
        Ok(reply.payload.as_u64())
    }

    /// Query the protocol-feature bitmask
    pub fn get_protocol_features(&mut self) -> Result<u64> {
        let reply = self.request(&Message::request(RequestCode::GetProtocolFeatures))?;
        Ok(reply.payload.as_u64())
    }

    /// Announce the features this client will use
    pub fn set_features(&mut self, features: u64) -> Result<()> {
        self.request(&Message::with_value(RequestCode::SetFeatures, features))?;
        Ok(())
    }

    /// Announce the protocol features this client will use
    pub fn set_protocol_features(&mut self, features: u64) -> Result<()> {
        self.request(&Message::with_value(
            RequestCode::SetProtocolFeatures,
            features,
        ))?;
        Ok(())
    }

    /// Claim ownership of the backend session
    pub fn set_owner(&mut self) -> Result<()> {
        self.request(&Message::request(RequestCode::SetOwner))?;
        Ok(())
    }

    /// GET_FEATURES followed by GET_PROTOCOL_FEATURES on this connection
    pub fn handshake(&mut self) -> Result<Handshake> {
        let features = self.request(&Message::request(RequestCode::GetFeatures))?;
        let protocol_features =
            self.request(&Message::request(RequestCode::GetProtocolFeatures))?;

        Ok(Handshake {
            features,
            protocol_features,
        })
    }
}
