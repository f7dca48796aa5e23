//! Protocol Layer: barrier message framing
//!
//! Prinsip desain:
//! - Satu byte tipe per pesan, bit-exact dengan node lain di cluster
//! - Length big-endian lewat `core::ByteStream`
//! - Decoder incremental untuk socket non-blocking

mod encoder;
mod message;

pub use encoder::{encode_frame, Decoder, Encoder};
pub use message::{Frame, MessageType, LENGTH_SIZE, MAX_PAYLOAD_SIZE, TYPE_SIZE};
