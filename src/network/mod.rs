//! Network Module
//!
//! Unix socket server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread, polling a shutdown signal between accepts
//! - One worker thread per connection, no state shared between workers
//! - Requests answered by a per-worker copy of the dispatcher

mod server;
mod connection;
mod client;
mod shutdown;

pub use server::{Server, ServerHandle};
pub use connection::{CloseReason, Connection, ConnectionState};
pub use client::{Client, Handshake, DEFAULT_CLIENT_SOCKET_PATH};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
