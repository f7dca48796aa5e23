//! Per-process session context
//!
//! Satu `Session` per proses: memiliki `DataIndex` proses, transport sesuai
//! role, dan queue event lokal untuk frame yang sedang berjalan.
//!
//! Alur per frame:
//! ```text
//! queue_event()*  →  sync_events()  →  (dispatch + render)  →  sync_swap_buffers()
//! ```

use std::mem;

use tracing::{error, info};

use crate::config::{FailurePolicy, Role, SessionConfig};
use crate::data::{DataIndex, EventQueue, Payload, Timestamp};
use crate::error::NetResult;
use crate::network::{ClusterSync, LocalSync, SyncClient, SyncServer};

pub struct Session {
    index: DataIndex,
    transport: Box<dyn ClusterSync>,
    pending: EventQueue,
    failure_policy: FailurePolicy,
    frame: u64,
}

impl Session {
    /// Buat session dan hubungkan transport sesuai role
    ///
    /// Server block sampai semua client terhubung; client mencoba ulang
    /// sampai server siap (dalam `connect_timeout`).
    pub fn start(config: SessionConfig) -> NetResult<Self> {
        let policy = config.failure_policy;
        let transport: Box<dyn ClusterSync> = match &config.role {
            Role::Server(server) => Box::new(apply(policy, SyncServer::start(server))?),
            Role::Client(client) => Box::new(apply(policy, SyncClient::connect(client))?),
            Role::Standalone => Box::new(LocalSync),
        };
        Ok(Self::with_transport(config, transport))
    }

    /// Session di atas transport yang sudah ada
    pub fn with_transport(config: SessionConfig, transport: Box<dyn ClusterSync>) -> Self {
        info!(role = transport.role_name(), index = %config.index_name, "session started");
        Self {
            index: DataIndex::new(&config.index_name),
            transport,
            pending: EventQueue::new(),
            failure_policy: config.failure_policy,
            frame: 0,
        }
    }

    pub fn index(&self) -> &DataIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut DataIndex {
        &mut self.index
    }

    pub fn role_name(&self) -> &'static str {
        self.transport.role_name()
    }

    /// Jumlah frame yang sudah selesai swap
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Event lokal untuk frame ini
    pub fn queue_event(&mut self, payload: impl Into<Payload>) -> Timestamp {
        self.pending.push(payload)
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Queue gabungan seluruh cluster; queue lokal dikosongkan
    pub fn sync_events(&mut self) -> NetResult<EventQueue> {
        let local = mem::take(&mut self.pending);
        let result = self.transport.sync_events(local);
        apply(self.failure_policy, result)
    }

    /// Barrier swap; frame counter naik setelah berhasil
    pub fn sync_swap_buffers(&mut self) -> NetResult<()> {
        let result = self.transport.sync_swap_buffers();
        apply(self.failure_policy, result)?;
        self.frame += 1;
        Ok(())
    }
}

/// Fail-fast: dengan `Abort`, error transport menghentikan proses
fn apply<T>(policy: FailurePolicy, result: NetResult<T>) -> NetResult<T> {
    match (policy, result) {
        (_, Ok(v)) => Ok(v),
        (FailurePolicy::Propagate, Err(e)) => Err(e),
        (FailurePolicy::Abort, Err(e)) => {
            error!(error = %e, "cluster synchronization failed, aborting");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::error::NetError;

    struct Failing;

    impl ClusterSync for Failing {
        fn sync_events(&mut self, _local: EventQueue) -> NetResult<EventQueue> {
            Err(NetError::Disconnected { peer: 0 })
        }

        fn sync_swap_buffers(&mut self) -> NetResult<()> {
            Err(NetError::Disconnected { peer: 0 })
        }

        fn role_name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_standalone_frame_cycle() {
        let mut session = Session::start(SessionConfig::default()).unwrap();
        assert_eq!(session.role_name(), "standalone");
        assert_eq!(session.index().name(), "MVR");

        session
            .index_mut()
            .add("/window/width", Value::Int(800))
            .unwrap();
        session.queue_event("<Key_Down type=\"string\">a</Key_Down>");
        session.queue_event("<Key_Up type=\"string\">a</Key_Up>");
        assert_eq!(session.pending_events(), 2);

        let events = session.sync_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(session.pending_events(), 0);
        let names: Vec<_> = events.iter().filter_map(|(_, p)| p.name()).collect();
        assert_eq!(names, vec!["Key_Down", "Key_Up"]);

        session.sync_swap_buffers().unwrap();
        assert_eq!(session.frame(), 1);
    }

    #[test]
    fn test_propagate_policy() {
        let config = SessionConfig {
            failure_policy: FailurePolicy::Propagate,
            ..SessionConfig::default()
        };
        let mut session = Session::with_transport(config, Box::new(Failing));
        assert!(matches!(
            session.sync_events(),
            Err(NetError::Disconnected { .. })
        ));
        assert!(session.sync_swap_buffers().is_err());
        assert_eq!(session.frame(), 0);
    }
}
