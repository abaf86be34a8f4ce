//! Dispatch Module
//!
//! Maps an inbound request to the reply the emulator sends back.
//!
//! ## Responsibilities
//! - Answer feature queries with the configured bitmasks
//! - Ack the SET_* requests with an empty reply
//! - Ack everything else, known or unknown, with a zero payload
//!
//! Dispatch is pure: the same request always produces the same reply, and
//! nothing is remembered between requests. Observation of exchanges (logging
//! the values a client claims to support, for instance) belongs to the
//! connection worker.

use crate::config::Config;
use crate::protocol::{Message, Payload, RequestCode, PAYLOAD_SIZE};

// =============================================================================
// Advertised Features
// =============================================================================

/// Protocol feature bit: multiple queues
pub const PROTOCOL_F_MQ: u32 = 0;

/// Protocol feature bit: log shared-memory fd
pub const PROTOCOL_F_LOG_SHMFD: u32 = 1;

/// Protocol feature bit: RARP announcement
pub const PROTOCOL_F_RARP: u32 = 2;

/// Protocol feature bit: REPLY_ACK
pub const PROTOCOL_F_REPLY_ACK: u32 = 3;

/// Feature bitmask advertised by default (virtio-net style device bits)
pub const DEFAULT_FEATURES: u64 = 0x1000_0200_0000;

/// Protocol-feature bitmask advertised by default: MQ and REPLY_ACK
pub const DEFAULT_PROTOCOL_FEATURES: u64 = (1 << PROTOCOL_F_MQ) | (1 << PROTOCOL_F_REPLY_ACK);

/// The request dispatcher
///
/// Holds nothing but the two bitmasks it advertises, so every worker gets
/// its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatcher {
    features: u64,
    protocol_features: u64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURES, DEFAULT_PROTOCOL_FEATURES)
    }
}

impl Dispatcher {
    /// Create a dispatcher advertising the given bitmasks
    pub fn new(features: u64, protocol_features: u64) -> Self {
        Self {
            features,
            protocol_features,
        }
    }

    /// Create a dispatcher from the advertised features in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.features, config.protocol_features)
    }

    /// Feature bitmask returned for GET_FEATURES
    pub fn features(&self) -> u64 {
        self.features
    }

    /// Protocol-feature bitmask returned for GET_PROTOCOL_FEATURES
    pub fn protocol_features(&self) -> u64 {
        self.protocol_features
    }

    /// Build the reply for `request`
    ///
    /// The reply echoes the request code and always has the reply flag set.
    /// Payloads of SET_* requests are accepted as-is and not validated.
    pub fn dispatch(&self, request: &Message) -> Message {
        match request.request_code() {
            Some(RequestCode::GetFeatures) => Self::value_reply(request, self.features),
            Some(RequestCode::GetProtocolFeatures) => {
                Self::value_reply(request, self.protocol_features)
            }
            Some(RequestCode::SetFeatures)
            | Some(RequestCode::SetProtocolFeatures)
            | Some(RequestCode::SetOwner) => Message::reply(request.request, 0, Payload::ZERO),
            // Acknowledged but not emulated
            _ => Message::reply(request.request, PAYLOAD_SIZE, Payload::ZERO),
        }
    }

    fn value_reply(request: &Message, value: u64) -> Message {
        Message::reply(request.request, PAYLOAD_SIZE, Payload::SingleValue(value))
    }
}
