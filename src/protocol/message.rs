//! Message definitions
//!
//! The single fixed-size entity exchanged in both directions.

use super::RequestCode;

/// Flag bit set on every reply
pub const FLAG_REPLY: u32 = 0x1;

/// Number of payload bytes that are meaningful when a reply carries a value
pub const PAYLOAD_SIZE: u32 = 8;

/// The 8-byte payload
///
/// Both variants are views of the same bytes: `index` is the low half and
/// `num` the high half of the 64-bit value. Which view applies is decided by
/// the request code.
#[derive(Debug, Clone, Copy)]
pub enum Payload {
    SingleValue(u64),
    IndexNum { index: u32, num: u32 },
}

impl Payload {
    /// Payload with all bytes zero
    pub const ZERO: Payload = Payload::SingleValue(0);

    /// Interpret raw payload bytes for the given request code
    pub fn for_request(request: u32, raw: u64) -> Self {
        match RequestCode::from_u32(request) {
            Some(code) if code.carries_vring_state() => Payload::IndexNum {
                index: raw as u32,
                num: (raw >> 32) as u32,
            },
            _ => Payload::SingleValue(raw),
        }
    }

    /// The payload as a single 64-bit value
    pub fn as_u64(&self) -> u64 {
        match *self {
            Payload::SingleValue(value) => value,
            Payload::IndexNum { index, num } => (index as u64) | ((num as u64) << 32),
        }
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.as_u64() == other.as_u64()
    }
}

impl Eq for Payload {}

impl Default for Payload {
    fn default() -> Self {
        Payload::ZERO
    }
}

/// A request or reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    /// Request code (raw, so unknown codes survive a round trip)
    pub request: u32,

    /// Flag bits; bit 0 is [`FLAG_REPLY`]
    pub flags: u32,

    /// Number of meaningful payload bytes (0 or 8)
    pub size: u32,

    pub payload: Payload,
}

impl Message {
    /// Create a request with no payload, the way a client opens an exchange
    pub fn request(code: impl Into<u32>) -> Self {
        Self {
            request: code.into(),
            flags: FLAG_REPLY,
            size: 0,
            payload: Payload::ZERO,
        }
    }

    /// Create a request carrying a 64-bit value
    pub fn with_value(code: impl Into<u32>, value: u64) -> Self {
        let request = code.into();
        Self {
            request,
            flags: FLAG_REPLY,
            size: PAYLOAD_SIZE,
            payload: Payload::for_request(request, value),
        }
    }

    /// Create a reply to `request` with the given size and payload
    pub fn reply(request: u32, size: u32, payload: Payload) -> Self {
        Self {
            request,
            flags: FLAG_REPLY,
            size,
            payload,
        }
    }

    /// The typed request code, if defined
    pub fn request_code(&self) -> Option<RequestCode> {
        RequestCode::from_u32(self.request)
    }

    /// Whether the reply flag is set
    pub fn is_reply(&self) -> bool {
        self.flags & FLAG_REPLY != 0
    }

    /// Human-readable request name, `UNKNOWN(n)` for undefined codes
    pub fn request_name(&self) -> String {
        match self.request_code() {
            Some(code) => code.name().to_string(),
            None => format!("UNKNOWN({})", self.request),
        }
    }
}
