//! Barrier server dengan event-driven I/O
//!
//! Menggunakan mio untuk menunggu semua client dalam satu poll loop,
//! bukan membaca client satu per satu.
//!
//! Per frame:
//! 1. Tunggu satu EVENTS dari setiap client, merge ke queue lokal
//!    (urutan client), serialize sekali, kirim bytes yang sama ke semua
//! 2. Tunggu SWAP_REQUEST dari setiap client, broadcast SWAP_NOW

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::time::{Duration, Instant};

use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use super::{ClusterSync, Connection};
use crate::config::ServerConfig;
use crate::data::EventQueue;
use crate::error::{NetError, NetResult};
use crate::protocol::{encode_frame, Frame, MessageType};

const MIN_EVENTS_CAPACITY: usize = 64;

/// Socket yang sudah bind tetapi belum menerima client
pub struct ServerListener {
    listener: TcpListener,
    config: ServerConfig,
}

impl ServerListener {
    pub fn local_addr(&self) -> NetResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Block sampai `expected_clients` client terhubung
    pub fn accept_clients(self) -> NetResult<SyncServer> {
        let expected = self.config.expected_clients;
        let poll = Poll::new()?;
        let mut connections = Vec::with_capacity(expected);

        while connections.len() < expected {
            let (stream, addr) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let peer = connections.len();
            let mut conn = Connection::new(stream, peer, self.config.socket_buffer_size)?;
            poll.registry().register(
                conn.stream_mut(),
                Token(peer),
                Interest::READABLE | Interest::WRITABLE,
            )?;
            info!(peer, %addr, connected = peer + 1, expected, "client connected");
            connections.push(conn);
        }

        Ok(SyncServer {
            poll,
            events: Events::with_capacity(expected.max(MIN_EVENTS_CAPACITY)),
            connections,
            barrier_timeout: self.config.barrier_timeout,
        })
    }
}

/// Server yang sudah memiliki seluruh client cluster
pub struct SyncServer {
    poll: Poll,
    events: Events,
    connections: Vec<Connection>,
    barrier_timeout: Option<Duration>,
}

impl SyncServer {
    /// Bind tanpa menerima client
    pub fn listen(config: &ServerConfig) -> NetResult<ServerListener> {
        let listener = TcpListener::bind(&config.bind_addr)?;
        info!(addr = %listener.local_addr()?, expected = config.expected_clients, "barrier server listening");
        Ok(ServerListener {
            listener,
            config: config.clone(),
        })
    }

    /// `listen` + `accept_clients`
    pub fn start(config: &ServerConfig) -> NetResult<Self> {
        Self::listen(config)?.accept_clients()
    }

    pub fn client_count(&self) -> usize {
        self.connections.len()
    }

    fn deadline(&self) -> Option<Instant> {
        self.barrier_timeout.map(|t| Instant::now() + t)
    }

    /// Poll sekali, membaca / flush connection yang siap
    fn poll_once(&mut self, deadline: Option<Instant>) -> NetResult<()> {
        let timeout = match deadline {
            Some(d) => {
                let now = Instant::now();
                if now >= d {
                    return Err(NetError::Timeout(self.barrier_timeout.unwrap_or_default()));
                }
                Some(d - now)
            }
            None => None,
        };

        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        for event in self.events.iter() {
            let Some(conn) = self.connections.get_mut(event.token().0) else {
                continue;
            };
            if event.is_readable() || event.is_read_closed() {
                conn.fill_read_buffer()?;
            }
            if event.is_writable() && conn.write_pending() > 0 {
                conn.flush_write_buffer()?;
            }
        }
        Ok(())
    }

    /// Tunggu tepat satu frame `want` dari setiap client
    fn wait_for_all(&mut self, want: MessageType) -> NetResult<Vec<Frame>> {
        let deadline = self.deadline();
        let mut slots: Vec<Option<Frame>> = vec![None; self.connections.len()];

        // Data yang sudah ada di socket sebelum barrier ini
        for conn in &mut self.connections {
            conn.fill_read_buffer()?;
        }

        loop {
            for (conn, slot) in self.connections.iter_mut().zip(slots.iter_mut()) {
                while slot.is_none() {
                    let Some(frame) = conn.next_frame() else {
                        break;
                    };
                    let frame = frame?;
                    if frame.message_type() == want {
                        *slot = Some(frame);
                    } else {
                        warn!(peer = conn.peer(), expected = ?want, got = ?frame.message_type(), "skipping unexpected message");
                    }
                }
            }
            if slots.iter().all(Option::is_some) {
                break;
            }
            self.poll_once(deadline)?;
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Kirim bytes yang sama ke semua client dan tunggu sampai terkirim
    fn broadcast(&mut self, bytes: &[u8]) -> NetResult<()> {
        let deadline = self.deadline();
        for conn in &mut self.connections {
            conn.queue_write(bytes);
            conn.flush_write_buffer()?;
        }
        while self.connections.iter().any(|c| c.write_pending() > 0) {
            self.poll_once(deadline)?;
        }
        Ok(())
    }
}

impl ClusterSync for SyncServer {
    fn sync_events(&mut self, local: EventQueue) -> NetResult<EventQueue> {
        let frames = self.wait_for_all(MessageType::Events)?;

        let mut merged = local;
        for (peer, frame) in frames.into_iter().enumerate() {
            if let Frame::Events(text) = frame {
                merged.merge_serialized(&text).map_err(|e| {
                    warn!(peer, error = %e, "client sent a corrupted event queue");
                    e
                })?;
            }
        }

        let blob = merged.serialize();
        let result = EventQueue::parse(&blob)?;
        let bytes = encode_frame(&Frame::Events(blob))?;
        self.broadcast(&bytes)?;
        debug!(
            events = result.len(),
            bytes = bytes.len(),
            clients = self.connections.len(),
            "events barrier complete"
        );
        Ok(result)
    }

    fn sync_swap_buffers(&mut self) -> NetResult<()> {
        self.wait_for_all(MessageType::SwapRequest)?;
        let bytes = encode_frame(&Frame::SwapNow)?;
        self.broadcast(&bytes)?;
        debug!(clients = self.connections.len(), "swap barrier complete");
        Ok(())
    }

    fn role_name(&self) -> &'static str {
        "server"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_clients_is_local_merge() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".into(),
            expected_clients: 0,
            ..ServerConfig::default()
        };
        let mut server = SyncServer::start(&config).unwrap();
        assert_eq!(server.client_count(), 0);

        let mut local = EventQueue::new();
        local.push_at(7, "<a type=\"int\">1</a>");
        let merged = server.sync_events(local).unwrap();
        assert_eq!(merged.len(), 1);
        server.sync_swap_buffers().unwrap();
    }

    #[test]
    fn test_barrier_timeout() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".into(),
            expected_clients: 1,
            barrier_timeout: Some(Duration::from_millis(50)),
            ..ServerConfig::default()
        };
        let listener = SyncServer::listen(&config).unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = std::net::TcpStream::connect(addr).unwrap();
        let mut server = listener.accept_clients().unwrap();

        assert!(matches!(
            server.sync_swap_buffers(),
            Err(NetError::Timeout(_))
        ));
    }
}
