//! Barrier Message Format
//!
//! Layout:
//! ┌──────────┬──────────────────────┬──────────────────────────┐
//! │ type (u8)│ len (u32, BE)        │ queue text (len bytes)   │
//! └──────────┴──────────────────────┴──────────────────────────┘
//!
//! Hanya EVENTS yang membawa length dan body; SWAP_REQUEST dan SWAP_NOW
//! adalah satu byte saja.

/// Tipe pesan barrier
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Serialized event queue (client → server, lalu server → semua client)
    Events = 1,
    /// Client siap swap buffer
    SwapRequest = 2,
    /// Server mengizinkan semua node swap
    SwapNow = 3,
}

impl MessageType {
    #[inline(always)]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Events),
            2 => Some(Self::SwapRequest),
            3 => Some(Self::SwapNow),
            _ => None,
        }
    }

    /// Apakah tipe ini membawa length + body
    #[inline(always)]
    pub fn has_body(self) -> bool {
        matches!(self, Self::Events)
    }
}

pub const TYPE_SIZE: usize = 1;
pub const LENGTH_SIZE: usize = 4;
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024; // 64MB max queue text

/// Satu pesan utuh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Events(String),
    SwapRequest,
    SwapNow,
}

impl Frame {
    #[inline(always)]
    pub fn message_type(&self) -> MessageType {
        match self {
            Frame::Events(_) => MessageType::Events,
            Frame::SwapRequest => MessageType::SwapRequest,
            Frame::SwapNow => MessageType::SwapNow,
        }
    }

    /// Total ukuran di wire
    #[inline(always)]
    pub fn wire_size(&self) -> usize {
        match self {
            Frame::Events(text) => TYPE_SIZE + LENGTH_SIZE + text.len(),
            _ => TYPE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_bytes() {
        assert_eq!(MessageType::Events as u8, 1);
        assert_eq!(MessageType::SwapRequest as u8, 2);
        assert_eq!(MessageType::SwapNow as u8, 3);
        assert_eq!(MessageType::from_u8(0), None);
        assert_eq!(MessageType::from_u8(4), None);
    }

    #[test]
    fn test_wire_size() {
        assert_eq!(Frame::Events("abc".into()).wire_size(), 8);
        assert_eq!(Frame::SwapNow.wire_size(), 1);
        assert!(!MessageType::SwapRequest.has_body());
    }
}
