//! Barrier client (blocking)
//!
//! Satu koneksi ke server. Setiap barrier: kirim pesan, lalu block sampai
//! balasan yang ditunggu datang. Byte lain di-log dan dilewati.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::ClusterSync;
use crate::config::ClientConfig;
use crate::data::EventQueue;
use crate::error::{NetError, NetResult};
use crate::protocol::{encode_frame, Decoder, Frame, MessageType};

const READ_CHUNK_SIZE: usize = 64 * 1024;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct SyncClient {
    stream: TcpStream,
    decoder: Decoder,
    read_buffer: Box<[u8]>,
    barrier_timeout: Option<Duration>,
}

impl SyncClient {
    /// Connect ke server
    ///
    /// Dengan `connect_timeout`, koneksi yang gagal dicoba ulang sampai
    /// server siap atau waktu habis.
    pub fn connect(config: &ClientConfig) -> NetResult<Self> {
        let started = Instant::now();
        let mut attempts = 0u32;
        let stream = loop {
            attempts += 1;
            match TcpStream::connect(&config.server_addr) {
                Ok(stream) => break stream,
                Err(e) => {
                    let waited = started.elapsed();
                    match config.connect_timeout {
                        Some(limit) if waited < limit => {
                            if attempts == 1 {
                                info!(addr = %config.server_addr, error = %e, "server not ready, retrying");
                            }
                            thread::sleep(CONNECT_RETRY_DELAY);
                        }
                        Some(_) => {
                            return Err(NetError::ConnectFailed {
                                addr: config.server_addr.clone(),
                                waited,
                            })
                        }
                        None => return Err(e.into()),
                    }
                }
            }
        };

        // CRITICAL: TCP_NODELAY untuk low latency
        stream.set_nodelay(true)?;
        info!(addr = %config.server_addr, attempts, "connected to barrier server");

        Ok(Self {
            stream,
            decoder: Decoder::new(),
            read_buffer: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            barrier_timeout: config.barrier_timeout,
        })
    }

    fn send(&mut self, frame: &Frame) -> NetResult<()> {
        let bytes = encode_frame(frame)?;
        self.stream.write_all(&bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Block sampai frame bertipe `want` diterima
    ///
    /// `barrier_timeout` adalah deadline untuk seluruh barrier, bukan per read.
    fn wait_for(&mut self, want: MessageType) -> NetResult<Frame> {
        let deadline = self.barrier_timeout.map(|limit| Instant::now() + limit);
        loop {
            while let Some(frame) = self.decoder.next() {
                let frame = frame?;
                if frame.message_type() == want {
                    return Ok(frame);
                }
                warn!(expected = ?want, got = ?frame.message_type(), "skipping unexpected message");
            }

            if let Some(deadline) = deadline {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Err(self.timed_out());
                }
                self.stream.set_read_timeout(Some(left))?;
            }

            match self.stream.read(&mut self.read_buffer) {
                Ok(0) => return Err(NetError::Disconnected { peer: 0 }),
                Ok(n) => self.decoder.feed(&self.read_buffer[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(self.timed_out());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn timed_out(&self) -> NetError {
        NetError::Timeout(self.barrier_timeout.unwrap_or_default())
    }
}

impl ClusterSync for SyncClient {
    fn sync_events(&mut self, local: EventQueue) -> NetResult<EventQueue> {
        self.send(&Frame::Events(local.serialize()))?;
        match self.wait_for(MessageType::Events)? {
            Frame::Events(text) => {
                let merged = EventQueue::parse(&text)?;
                debug!(events = merged.len(), bytes = text.len(), "events barrier complete");
                Ok(merged)
            }
            _ => unreachable!("wait_for returns only the requested type"),
        }
    }

    fn sync_swap_buffers(&mut self) -> NetResult<()> {
        self.send(&Frame::SwapRequest)?;
        self.wait_for(MessageType::SwapNow)?;
        debug!("swap barrier complete");
        Ok(())
    }

    fn role_name(&self) -> &'static str {
        "client"
    }
}
