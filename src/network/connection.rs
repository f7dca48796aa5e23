//! Server-side client connection dengan buffered I/O
//!
//! Socket non-blocking di bawah `mio` (edge-triggered): setiap readable event
//! harus dibaca sampai `WouldBlock`, dan write yang belum selesai disimpan
//! sampai socket writable lagi.

use std::io::{self, Read, Write};
use std::net::SocketAddr;

use mio::net::TcpStream;
use tracing::trace;

use crate::error::{NetError, NetResult, ProtocolError};
use crate::protocol::{Decoder, Frame};

/// Buffer sizes - tuned untuk typical queue sizes
const READ_CHUNK_SIZE: usize = 64 * 1024; // 64KB

pub struct Connection {
    stream: TcpStream,
    peer: usize,
    addr: SocketAddr,
    read_buffer: Box<[u8]>,
    decoder: Decoder,
    write_buffer: Vec<u8>,
}

impl Connection {
    /// Wrap stream hasil accept; `peer` adalah index client di cluster
    pub fn new(
        stream: std::net::TcpStream,
        peer: usize,
        socket_buffer_size: Option<usize>,
    ) -> io::Result<Self> {
        // Disable Nagle's algorithm untuk lower latency
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        if let Some(size) = socket_buffer_size {
            tune_socket_buffers(&stream, size);
        }
        let addr = stream.peer_addr()?;

        Ok(Self {
            stream: TcpStream::from_std(stream),
            peer,
            addr,
            read_buffer: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            decoder: Decoder::new(),
            write_buffer: Vec::new(),
        })
    }

    #[inline(always)]
    pub fn peer(&self) -> usize {
        self.peer
    }

    #[inline(always)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Baca semua yang tersedia sampai `WouldBlock`
    ///
    /// Returns jumlah bytes yang dibaca. Peer yang menutup koneksi
    /// adalah `NetError::Disconnected`.
    pub fn fill_read_buffer(&mut self) -> NetResult<usize> {
        let mut total = 0;
        loop {
            match self.stream.read(&mut self.read_buffer) {
                Ok(0) => return Err(NetError::Disconnected { peer: self.peer }),
                Ok(n) => {
                    self.decoder.feed(&self.read_buffer[..n]);
                    total += n;
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if total > 0 {
            trace!(peer = self.peer, bytes = total, "read");
        }
        Ok(total)
    }

    /// Frame lengkap berikutnya dari data yang sudah dibaca
    #[inline]
    pub fn next_frame(&mut self) -> Option<Result<Frame, ProtocolError>> {
        self.decoder.next()
    }

    /// Queue data untuk write
    #[inline]
    pub fn queue_write(&mut self, data: &[u8]) {
        self.write_buffer.extend_from_slice(data);
    }

    /// Flush write buffer ke socket; sisa partial write tetap di buffer
    pub fn flush_write_buffer(&mut self) -> io::Result<()> {
        let mut written = 0;
        while written < self.write_buffer.len() {
            match self.stream.write(&self.write_buffer[written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "Failed to write to socket",
                    ));
                }
                Ok(n) => written += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.write_buffer.drain(..written);
        Ok(())
    }

    /// Bytes pending in write buffer
    #[inline(always)]
    pub fn write_pending(&self) -> usize {
        self.write_buffer.len()
    }

    /// Underlying stream untuk registrasi ke `mio::Poll`
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

/// Set SO_SNDBUF / SO_RCVBUF
///
/// Error diabaikan - tidak semua platform mendukung ini
#[cfg(unix)]
fn tune_socket_buffers(stream: &std::net::TcpStream, size: usize) {
    use std::os::unix::io::AsRawFd;
    let fd = stream.as_raw_fd();
    let optval = size.min(libc::c_int::MAX as usize) as libc::c_int;
    unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_SNDBUF,
            &optval as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_RCVBUF,
            &optval as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
    }
}

#[cfg(not(unix))]
fn tune_socket_buffers(_stream: &std::net::TcpStream, _size: usize) {}
