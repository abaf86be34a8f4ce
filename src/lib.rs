//! # vhost-user-emu
//!
//! A minimal vhost-user control-plane emulator with:
//! - Fixed 20-byte request/reply framing over a Unix stream socket
//! - Feature and protocol-feature discovery
//! - A permissive dispatch table that acks every other request
//! - One worker thread per connection
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Unix Socket Listener                      │
//! │                   (accept + shutdown poll)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one thread per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Connection Worker                          │
//! │            (read 20 bytes → dispatch → write)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │          │  Dispatcher │
//!   │  (bincode)  │          │   (pure)    │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod dispatch;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VhostError, Result};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use network::{Client, Server, ServerHandle};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of vhost-user-emu
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
