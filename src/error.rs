//! Error types for vhost-user-emu
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using VhostError
pub type Result<T> = std::result::Result<T, VhostError>;

/// Unified error type for vhost-user-emu operations
#[derive(Debug, Error)]
pub enum VhostError {
    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    /// A received block was not exactly one message long
    #[error("Framing error: expected {expected} bytes, got {actual}")]
    Framing { expected: usize, actual: usize },

    #[error("Unexpected reply: sent request {expected}, reply carries {actual}")]
    UnexpectedReply { expected: u32, actual: u32 },

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    /// Socket accept/receive/send failed for a reason other than clean closure
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Connect error: {0}")]
    Connect(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    /// The listener cannot bind or listen on the configured address
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Listener thread panicked")]
    ListenerPanicked,
}

impl VhostError {
    /// True when the peer sent something that is not a well-formed reply
    pub fn is_malformed_reply(&self) -> bool {
        matches!(
            self,
            VhostError::Framing { .. } | VhostError::UnexpectedReply { .. }
        )
    }
}

impl From<bincode::Error> for VhostError {
    fn from(err: bincode::Error) -> Self {
        VhostError::Serialization(err.to_string())
    }
}
