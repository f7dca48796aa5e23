//! framelock: frame-locked event and swap-buffer synchronization
//! untuk cluster rendering multi-proses.
//!
//! Layer (leaf-first):
//! - `core`: endian-normalized byte codec
//! - `data`: typed values, hierarchical index, event queue
//! - `protocol`: EVENTS / SWAP_REQUEST / SWAP_NOW framing
//! - `network`: TCP barrier server dan client
//! - `session`: per-process context yang menggabungkan semuanya

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod network;
pub mod protocol;
pub mod session;
pub mod telemetry;

pub use config::{ClientConfig, FailurePolicy, Role, ServerConfig, SessionConfig};
pub use data::{DataIndex, EventQueue, Payload, Timestamp, Value, ValueType};
pub use error::{ConfigError, DataError, NetError, ProtocolError, QueueError};
pub use network::{ClusterSync, SyncClient, SyncServer};
pub use session::Session;
