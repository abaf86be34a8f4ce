//! Protocol Module
//!
//! Defines the wire protocol shared by the server and the client.
//!
//! ## Message Format
//! ```text
//! ┌──────────────┬────────────┬───────────┬───────────────────────┐
//! │ Request (4)  │ Flags (4)  │ Size (4)  │      Payload (8)      │
//! └──────────────┴────────────┴───────────┴───────────────────────┘
//! ```
//!
//! ### Requests handled specially
//! - 1:  GET_FEATURES          - reply payload: feature bitmask
//! - 2:  SET_FEATURES          - reply size 0
//! - 3:  SET_OWNER             - reply size 0
//! - 15: GET_PROTOCOL_FEATURES - reply payload: protocol-feature bitmask
//! - 16: SET_PROTOCOL_FEATURES - reply size 0
//!
//! Every other code, defined or not, is acked with an 8-byte zero payload.

mod request;
mod message;
mod codec;

pub use request::RequestCode;
pub use message::{Message, Payload, FLAG_REPLY, PAYLOAD_SIZE};
pub use codec::{encode, decode, read_message, write_message, MESSAGE_SIZE};
