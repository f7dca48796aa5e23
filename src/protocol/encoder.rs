//! Frame Encoder/Decoder
//!
//! Encoder menulis ke `ByteStream` yang di-reuse antar frame.
//! Decoder bersifat incremental: byte dari socket di-`feed`, frame diambil
//! dengan `next()` begitu lengkap.

use tracing::warn;

use super::message::{Frame, MessageType, LENGTH_SIZE, MAX_PAYLOAD_SIZE, TYPE_SIZE};
use crate::core::{unpack_u32, ByteStream};
use crate::error::ProtocolError;

/// Reusable frame encoder
pub struct Encoder {
    stream: ByteStream,
}

impl Encoder {
    /// Membuat encoder dengan kapasitas awal tertentu
    pub fn new(capacity: usize) -> Self {
        Self {
            stream: ByteStream::with_capacity(capacity),
        }
    }

    /// Reset encoder untuk reuse
    #[inline(always)]
    pub fn reset(&mut self) {
        self.stream.clear();
    }

    /// Encode satu frame (append ke buffer)
    pub fn encode(&mut self, frame: &Frame) -> Result<&[u8], ProtocolError> {
        let start = self.stream.write_offset();
        match frame {
            Frame::Events(text) => {
                if text.len() > MAX_PAYLOAD_SIZE {
                    return Err(ProtocolError::PayloadTooLarge(text.len()));
                }
                self.stream.write_u8(MessageType::Events as u8);
                self.stream.write_u32(text.len() as u32);
                self.stream.write_raw(text.as_bytes());
            }
            other => self.stream.write_u8(other.message_type() as u8),
        }
        Ok(&self.stream.as_bytes()[start..])
    }

    /// Get current buffer content
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        self.stream.as_bytes()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(4096)
    }
}

/// Encode satu frame ke Vec baru
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, ProtocolError> {
    let mut encoder = Encoder::new(frame.wire_size());
    encoder.encode(frame)?;
    Ok(encoder.stream.into_bytes())
}

/// Incremental decoder
#[derive(Default)]
pub struct Decoder {
    buffer: Vec<u8>,
    read_pos: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tambah byte dari socket
    pub fn feed(&mut self, data: &[u8]) {
        // Compact buffer
        if self.read_pos > 0 {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Decode frame berikutnya
    ///
    /// `None` jika data belum lengkap. Byte tipe yang tidak dikenal
    /// di-log dan dilewati.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Result<Frame, ProtocolError>> {
        loop {
            let type_byte = *self.buffer.get(self.read_pos)?;
            let Some(msg_type) = MessageType::from_u8(type_byte) else {
                warn!(byte = type_byte, "skipping unexpected message byte");
                self.read_pos += TYPE_SIZE;
                continue;
            };

            if !msg_type.has_body() {
                self.read_pos += TYPE_SIZE;
                return Some(Ok(match msg_type {
                    MessageType::SwapRequest => Frame::SwapRequest,
                    _ => Frame::SwapNow,
                }));
            }

            let len_start = self.read_pos + TYPE_SIZE;
            let body_start = len_start + LENGTH_SIZE;
            if self.buffer.len() < body_start {
                return None;
            }
            let len = unpack_u32(&self.buffer[len_start..body_start]) as usize;
            if len > MAX_PAYLOAD_SIZE {
                // Tidak bisa resync setelah length rusak
                self.read_pos = self.buffer.len();
                return Some(Err(ProtocolError::PayloadTooLarge(len)));
            }
            let body_end = body_start + len;
            if self.buffer.len() < body_end {
                return None;
            }
            self.read_pos = body_end;
            return Some(
                std::str::from_utf8(&self.buffer[body_start..body_end])
                    .map(|text| Frame::Events(text.to_string()))
                    .map_err(|_| ProtocolError::InvalidUtf8),
            );
        }
    }

    /// Bytes yang belum di-decode
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.read_pos)
    }
}
