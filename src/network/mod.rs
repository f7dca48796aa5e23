//! Network Layer: TCP barrier untuk cluster rendering
//!
//! Dua rendezvous per frame, selalu dalam urutan ini:
//! 1. `sync_events`: semua node mendapat queue gabungan yang identik
//! 2. `sync_swap_buffers`: tidak ada node yang swap sebelum semua siap
//!
//! Server memakai mio untuk menunggu semua client sekaligus;
//! client memakai blocking I/O biasa.

mod client;
mod connection;
mod server;

pub use client::SyncClient;
pub use connection::Connection;
pub use server::{ServerListener, SyncServer};

use crate::data::EventQueue;
use crate::error::NetResult;

/// Per-frame synchronization point
pub trait ClusterSync {
    /// Kirim queue lokal, return queue gabungan seluruh cluster
    fn sync_events(&mut self, local: EventQueue) -> NetResult<EventQueue>;

    /// Block sampai seluruh cluster siap swap buffer
    fn sync_swap_buffers(&mut self) -> NetResult<()>;

    fn role_name(&self) -> &'static str;
}

/// Proses tunggal tanpa peer
///
/// Queue tetap melewati serialize/parse agar payload yang diterima
/// aplikasi sama bentuknya dengan node di cluster.
#[derive(Debug, Default)]
pub struct LocalSync;

impl ClusterSync for LocalSync {
    fn sync_events(&mut self, local: EventQueue) -> NetResult<EventQueue> {
        Ok(EventQueue::parse(&local.serialize())?)
    }

    fn sync_swap_buffers(&mut self) -> NetResult<()> {
        Ok(())
    }

    fn role_name(&self) -> &'static str {
        "standalone"
    }
}
