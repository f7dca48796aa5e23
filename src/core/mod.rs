//! Core module: endian-normalized byte codec
//!
//! Prinsip desain:
//! - Satu wire byte order (big-endian) untuk semua host
//! - Read/write cursor independen di atas satu buffer
//! - Read yang gagal tidak panic: warning + zero value

mod byte_stream;

pub use byte_stream::{
    host_is_little_endian, pack_f32, pack_i32, pack_i64, pack_u32, unpack_f32, unpack_i32,
    unpack_i64, unpack_u32, ByteData, ByteStream, SIZE_OF_FLOAT, SIZE_OF_INT, SIZE_OF_LONG,
};
