//! Endian-normalized byte packing
//!
//! Semua integer dan float di-pack ke satu urutan byte wire yang tetap
//! (most-significant-byte-first), apapun byte order host-nya.
//!
//! Layout length-prefixed value:
//! ┌──────────────────────┬────────────────────────────┐
//! │ length (i32, BE)     │ bytes (length)             │
//! └──────────────────────┴────────────────────────────┘

use byteorder::{BigEndian, ByteOrder};
use tracing::warn;

pub const SIZE_OF_INT: usize = 4;
pub const SIZE_OF_FLOAT: usize = 4;
pub const SIZE_OF_LONG: usize = 8;

/// Cek endianness saat runtime (untuk diagnostik saja, codec tidak bergantung padanya)
#[inline]
pub fn host_is_little_endian() -> bool {
    let marker: u32 = 0x0123_4567;
    marker.to_ne_bytes()[0] == 0x67
}

#[inline(always)]
pub fn pack_i32(buf: &mut [u8], value: i32) {
    BigEndian::write_i32(buf, value);
}

#[inline(always)]
pub fn unpack_i32(buf: &[u8]) -> i32 {
    BigEndian::read_i32(buf)
}

#[inline(always)]
pub fn pack_u32(buf: &mut [u8], value: u32) {
    BigEndian::write_u32(buf, value);
}

#[inline(always)]
pub fn unpack_u32(buf: &[u8]) -> u32 {
    BigEndian::read_u32(buf)
}

#[inline(always)]
pub fn pack_i64(buf: &mut [u8], value: i64) {
    BigEndian::write_i64(buf, value);
}

#[inline(always)]
pub fn unpack_i64(buf: &[u8]) -> i64 {
    BigEndian::read_i64(buf)
}

#[inline(always)]
pub fn pack_f32(buf: &mut [u8], value: f32) {
    BigEndian::write_f32(buf, value);
}

#[inline(always)]
pub fn unpack_f32(buf: &[u8]) -> f32 {
    BigEndian::read_f32(buf)
}

/// Owned byte blob
///
/// `to_i32()` / `to_f32()` menginterpretasikan *seluruh* blob sebagai satu value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteData {
    bytes: Vec<u8>,
}

impl ByteData {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn from_i32(value: i32) -> Self {
        let mut bytes = vec![0u8; SIZE_OF_INT];
        pack_i32(&mut bytes, value);
        Self { bytes }
    }

    pub fn from_f32(value: f32) -> Self {
        let mut bytes = vec![0u8; SIZE_OF_FLOAT];
        pack_f32(&mut bytes, value);
        Self { bytes }
    }

    pub fn to_i32(&self) -> i32 {
        if self.bytes.len() != SIZE_OF_INT {
            warn!(size = self.bytes.len(), "byte data does not hold a single int");
            return 0;
        }
        unpack_i32(&self.bytes)
    }

    pub fn to_f32(&self) -> f32 {
        if self.bytes.len() != SIZE_OF_FLOAT {
            warn!(size = self.bytes.len(), "byte data does not hold a single float");
            return 0.0;
        }
        unpack_f32(&self.bytes)
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Growable byte buffer dengan read cursor dan write cursor yang independen
///
/// Write memperbesar buffer tepat sebanyak byte yang dibutuhkan.
/// Read yang melewati akhir buffer tidak panic: log warning, return zero/empty,
/// dan cursor tidak bergerak.
#[derive(Debug, Clone, Default)]
pub struct ByteStream {
    buffer: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl ByteStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Membuat stream dengan kapasitas awal (tanpa mengubah size)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Membuat stream untuk dibaca dari data yang sudah ada
    ///
    /// Write cursor di akhir data, sehingga write berikutnya append.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            buffer: bytes.to_vec(),
            read_pos: 0,
            write_pos: bytes.len(),
        }
    }

    /// Reserve `n` byte di write cursor, return slice untuk diisi
    #[inline]
    fn grow_for_write(&mut self, n: usize) -> &mut [u8] {
        let end = self.write_pos + n;
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        let start = self.write_pos;
        self.write_pos = end;
        &mut self.buffer[start..end]
    }

    /// Ambil `n` byte di read cursor, atau None jika melewati akhir buffer
    #[inline]
    fn take_for_read(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.read_pos.checked_add(n)?;
        if end > self.buffer.len() {
            warn!(
                read_pos = self.read_pos,
                requested = n,
                size = self.buffer.len(),
                "tried to read past the end of a byte stream"
            );
            return None;
        }
        let start = self.read_pos;
        self.read_pos = end;
        Some(&self.buffer[start..end])
    }

    // ── write ───────────────────────────────────────────────

    pub fn write_u8(&mut self, value: u8) {
        self.grow_for_write(1)[0] = value;
    }

    pub fn write_i32(&mut self, value: i32) {
        pack_i32(self.grow_for_write(SIZE_OF_INT), value);
    }

    pub fn write_u32(&mut self, value: u32) {
        pack_u32(self.grow_for_write(SIZE_OF_INT), value);
    }

    pub fn write_i64(&mut self, value: i64) {
        pack_i64(self.grow_for_write(SIZE_OF_LONG), value);
    }

    pub fn write_f32(&mut self, value: f32) {
        pack_f32(self.grow_for_write(SIZE_OF_FLOAT), value);
    }

    /// Length-prefixed string
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Length-prefixed opaque blob
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_i32(data.len() as i32);
        self.write_raw(data);
    }

    pub fn write_byte_data(&mut self, data: &ByteData) {
        self.write_bytes(data.as_bytes());
    }

    /// Raw bytes tanpa length prefix (caller menulis framing sendiri)
    pub fn write_raw(&mut self, data: &[u8]) {
        self.grow_for_write(data.len()).copy_from_slice(data);
    }

    // ── read ────────────────────────────────────────────────

    pub fn read_u8(&mut self) -> u8 {
        self.take_for_read(1).map(|b| b[0]).unwrap_or(0)
    }

    pub fn read_i32(&mut self) -> i32 {
        self.take_for_read(SIZE_OF_INT).map(unpack_i32).unwrap_or(0)
    }

    pub fn read_u32(&mut self) -> u32 {
        self.take_for_read(SIZE_OF_INT).map(unpack_u32).unwrap_or(0)
    }

    pub fn read_i64(&mut self) -> i64 {
        self.take_for_read(SIZE_OF_LONG).map(unpack_i64).unwrap_or(0)
    }

    pub fn read_f32(&mut self) -> f32 {
        self.take_for_read(SIZE_OF_FLOAT)
            .map(unpack_f32)
            .unwrap_or(0.0)
    }

    pub fn read_string(&mut self) -> String {
        let bytes = self.read_bytes();
        match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "length-prefixed string is not valid UTF-8");
                String::new()
            }
        }
    }

    pub fn read_bytes(&mut self) -> Vec<u8> {
        let start = self.read_pos;
        let size = self.read_i32();
        if size <= 0 {
            return Vec::new();
        }
        match self.take_for_read(size as usize) {
            Some(bytes) => bytes.to_vec(),
            None => {
                // Rewind supaya prefix length tidak ikut terkonsumsi
                self.read_pos = start;
                Vec::new()
            }
        }
    }

    pub fn read_byte_data(&mut self) -> ByteData {
        ByteData {
            bytes: self.read_bytes(),
        }
    }

    // ── cursors & buffer ────────────────────────────────────

    #[inline(always)]
    pub fn read_offset(&self) -> usize {
        self.read_pos
    }

    #[inline(always)]
    pub fn write_offset(&self) -> usize {
        self.write_pos
    }

    pub fn set_read_offset(&mut self, offset: usize) {
        self.read_pos = offset.min(self.buffer.len());
    }

    pub fn set_write_offset(&mut self, offset: usize) {
        self.write_pos = offset.min(self.buffer.len());
    }

    /// Bytes yang belum dibaca
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.read_pos)
    }

    /// Resize buffer; cursor yang melewati size baru di-clamp
    pub fn resize(&mut self, new_size: usize) {
        self.buffer.resize(new_size, 0);
        self.read_pos = self.read_pos.min(new_size);
        self.write_pos = self.write_pos.min(new_size);
    }

    /// Reset untuk reuse (kapasitas tetap)
    #[inline(always)]
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
        self.write_pos = 0;
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_is_big_endian() {
        let mut buf = [0u8; 4];
        pack_i32(&mut buf, 0x0102_0304);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);

        pack_f32(&mut buf, 1.0);
        assert_eq!(buf, [0x3f, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_host_endianness_matches_target() {
        assert_eq!(host_is_little_endian(), cfg!(target_endian = "little"));
    }

    #[test]
    fn test_writes_grow_exactly() {
        let mut stream = ByteStream::new();
        stream.write_u8(1);
        assert_eq!(stream.len(), 1);
        stream.write_i32(-7);
        assert_eq!(stream.len(), 5);
        stream.write_string("abc");
        assert_eq!(stream.len(), 5 + 4 + 3);
        stream.write_f32(2.5);
        assert_eq!(stream.len(), 16);
    }

    #[test]
    fn test_independent_cursors() {
        let mut stream = ByteStream::new();
        stream.write_i32(42);
        assert_eq!(stream.read_i32(), 42);

        stream.write_string("hello");
        stream.write_i64(-1_234_567_890_123);
        stream.write_f32(-0.5);

        assert_eq!(stream.read_string(), "hello");
        assert_eq!(stream.read_i64(), -1_234_567_890_123);
        assert_eq!(stream.read_f32(), -0.5);
        assert_eq!(stream.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_returns_zero() {
        let mut stream = ByteStream::from_bytes(&[0, 0]);
        assert_eq!(stream.read_i32(), 0);
        // Cursor tidak bergerak setelah read gagal
        assert_eq!(stream.read_offset(), 0);
        assert_eq!(stream.read_string(), "");
    }

    #[test]
    fn test_truncated_blob_is_empty() {
        let mut stream = ByteStream::new();
        stream.write_i32(10);
        stream.write_u8(b'x');
        assert!(stream.read_bytes().is_empty());
        assert_eq!(stream.read_offset(), 0);
    }

    #[test]
    fn test_overwrite_at_write_offset() {
        let mut stream = ByteStream::new();
        stream.write_i32(1);
        stream.write_i32(2);
        stream.set_write_offset(0);
        stream.write_i32(9);
        assert_eq!(stream.len(), 8);
        assert_eq!(stream.read_i32(), 9);
        assert_eq!(stream.read_i32(), 2);
    }

    #[test]
    fn test_byte_data_whole_value() {
        assert_eq!(ByteData::from_i32(-99).to_i32(), -99);
        assert_eq!(ByteData::from_f32(3.25).to_f32(), 3.25);
        assert_eq!(ByteData::new(&[1, 2, 3]).to_i32(), 0);

        let mut stream = ByteStream::new();
        stream.write_byte_data(&ByteData::new(b"blob"));
        assert_eq!(stream.read_byte_data().as_bytes(), b"blob");
    }
}
