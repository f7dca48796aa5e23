//! Error types per layer
//!
//! Data layer dan queue punya error sendiri; transport membungkus keduanya
//! karena payload EVENTS di-parse di dalam barrier.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::data::ValueType;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("name not found: {0}")]
    NotFound(String),

    #[error("type mismatch for {name}: stored {stored}, requested {requested}")]
    TypeMismatch {
        name: String,
        stored: ValueType,
        requested: ValueType,
    },

    #[error("container {container} lists {child}, which does not resolve")]
    DanglingChild { container: String, child: String },

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("namespace is not a container: {0}")]
    InvalidNamespace(String),

    #[error("parse error at byte {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    #[error("unknown type marker: {0:?}")]
    UnknownType(String),

    #[error("state stack is empty")]
    EmptyStateStack,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue header is missing or malformed")]
    MalformedHeader,

    #[error("queue corrupted: header announced {expected} items, parsed {found}")]
    Corrupted { expected: usize, found: usize },

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("event payload: {0}")]
    Payload(#[from] DataError),
}

#[derive(Debug, Error)]
pub enum NetError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("peer {peer} closed the connection")]
    Disconnected { peer: usize },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("barrier timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not connect to {addr} within {waited:?}")]
    ConnectFailed { addr: String, waited: Duration },

    #[error("event queue: {0}")]
    Queue(#[from] QueueError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("payload of {0} bytes exceeds the frame limit")]
    PayloadTooLarge(usize),

    #[error("events payload is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

pub type DataResult<T> = Result<T, DataError>;
pub type NetResult<T> = Result<T, NetError>;
