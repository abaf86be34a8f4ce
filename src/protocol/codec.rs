//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────┬────────────┬───────────┬───────────────────────┐
//! │ Request (4)  │ Flags (4)  │ Size (4)  │      Payload (8)      │
//! └──────────────┴────────────┴───────────┴───────────────────────┘
//! ```
//!
//! All fields little-endian, tightly packed. There is no length prefix:
//! every message is exactly [`MESSAGE_SIZE`] bytes.

use std::io::{ErrorKind, Read, Write};

use bincode::Options;
use serde::{Deserialize, Serialize};

use super::{Message, Payload};
use crate::error::{Result, VhostError};

/// Total encoded size: 4 + 4 + 4 + 8
pub const MESSAGE_SIZE: usize = 20;

/// Field-for-field image of a message as it sits on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    request: u32,
    flags: u32,
    size: u32,
    payload: u64,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            request: message.request,
            flags: message.flags,
            size: message.size,
            payload: message.payload.as_u64(),
        }
    }
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Self {
            request: wire.request,
            flags: wire.flags,
            size: wire.size,
            payload: Payload::for_request(wire.request, wire.payload),
        }
    }
}

/// Fixed-width, little-endian integers: no varints, no padding
fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

// =============================================================================
// Message Encoding/Decoding
// =============================================================================

/// Encode a message to its fixed-size wire form
pub fn encode(message: &Message) -> Result<[u8; MESSAGE_SIZE]> {
    let mut block = [0u8; MESSAGE_SIZE];
    wire_options().serialize_into(&mut block[..], &WireMessage::from(message))?;
    Ok(block)
}

/// Decode a message from exactly [`MESSAGE_SIZE`] bytes
pub fn decode(bytes: &[u8]) -> Result<Message> {
    if bytes.len() != MESSAGE_SIZE {
        return Err(VhostError::Framing {
            expected: MESSAGE_SIZE,
            actual: bytes.len(),
        });
    }

    let wire: WireMessage = wire_options().deserialize(bytes)?;
    Ok(wire.into())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one message from a stream
///
/// Blocks until a full message arrives, the stream ends, or an error occurs.
/// Returns `Ok(None)` when the stream ends cleanly on a message boundary and
/// a framing error when it ends part-way through one.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<Message>> {
    let mut block = [0u8; MESSAGE_SIZE];
    let mut filled = 0;

    while filled < MESSAGE_SIZE {
        match reader.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if filled == 0 {
        return Ok(None);
    }

    decode(&block[..filled]).map(Some)
}

/// Write a message to a stream
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
    let block = encode(message)?;
    writer.write_all(&block)?;
    writer.flush()?;
    Ok(())
}
