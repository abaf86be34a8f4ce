//! Request code definitions
//!
//! The wire-stable enumeration of vhost-user request codes.

use std::fmt;

/// Request codes understood by the emulator
///
/// Values outside this enumeration are still legal on the wire; they are
/// carried as raw `u32` in [`Message::request`](super::Message) and acked
/// with a zero payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RequestCode {
    None = 0,
    GetFeatures = 1,
    SetFeatures = 2,
    SetOwner = 3,
    ResetOwner = 4,
    SetMemTable = 5,
    SetLogBase = 6,
    SetLogFd = 7,
    SetVringNum = 8,
    SetVringAddr = 9,
    SetVringBase = 10,
    GetVringBase = 11,
    SetVringKick = 12,
    SetVringCall = 13,
    SetVringErr = 14,
    GetProtocolFeatures = 15,
    SetProtocolFeatures = 16,
}

impl RequestCode {
    /// Every defined code, in wire order
    pub const ALL: [RequestCode; 17] = [
        RequestCode::None,
        RequestCode::GetFeatures,
        RequestCode::SetFeatures,
        RequestCode::SetOwner,
        RequestCode::ResetOwner,
        RequestCode::SetMemTable,
        RequestCode::SetLogBase,
        RequestCode::SetLogFd,
        RequestCode::SetVringNum,
        RequestCode::SetVringAddr,
        RequestCode::SetVringBase,
        RequestCode::GetVringBase,
        RequestCode::SetVringKick,
        RequestCode::SetVringCall,
        RequestCode::SetVringErr,
        RequestCode::GetProtocolFeatures,
        RequestCode::SetProtocolFeatures,
    ];

    /// Map a raw wire value to a defined code
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Raw wire value
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Protocol name, as used in log lines
    pub fn name(self) -> &'static str {
        match self {
            RequestCode::None => "NONE",
            RequestCode::GetFeatures => "GET_FEATURES",
            RequestCode::SetFeatures => "SET_FEATURES",
            RequestCode::SetOwner => "SET_OWNER",
            RequestCode::ResetOwner => "RESET_OWNER",
            RequestCode::SetMemTable => "SET_MEM_TABLE",
            RequestCode::SetLogBase => "SET_LOG_BASE",
            RequestCode::SetLogFd => "SET_LOG_FD",
            RequestCode::SetVringNum => "SET_VRING_NUM",
            RequestCode::SetVringAddr => "SET_VRING_ADDR",
            RequestCode::SetVringBase => "SET_VRING_BASE",
            RequestCode::GetVringBase => "GET_VRING_BASE",
            RequestCode::SetVringKick => "SET_VRING_KICK",
            RequestCode::SetVringCall => "SET_VRING_CALL",
            RequestCode::SetVringErr => "SET_VRING_ERR",
            RequestCode::GetProtocolFeatures => "GET_PROTOCOL_FEATURES",
            RequestCode::SetProtocolFeatures => "SET_PROTOCOL_FEATURES",
        }
    }

    /// Whether the payload of this request is a vring `(index, num)` pair
    pub fn carries_vring_state(self) -> bool {
        matches!(
            self,
            RequestCode::SetVringNum | RequestCode::SetVringBase | RequestCode::GetVringBase
        )
    }
}

impl From<RequestCode> for u32 {
    fn from(code: RequestCode) -> Self {
        code.as_u32()
    }
}

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
