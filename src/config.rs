//! Configuration untuk server, client, dan session
//!
//! Default bisa di-overlay dari environment:
//!
//! | Variable                        | Field                          |
//! |---------------------------------|--------------------------------|
//! | `FRAMELOCK_BIND`                | `ServerConfig::bind_addr`      |
//! | `FRAMELOCK_CLIENTS`             | `ServerConfig::expected_clients` |
//! | `FRAMELOCK_SERVER`              | `ClientConfig::server_addr`    |
//! | `FRAMELOCK_TIMEOUT_MS`          | `barrier_timeout` (0 = tanpa batas) |
//! | `FRAMELOCK_CONNECT_TIMEOUT_MS`  | `ClientConfig::connect_timeout` |

use std::str::FromStr;
use std::time::Duration;

use crate::data::DEFAULT_INDEX_NAME;
use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3490;

const ENV_BIND: &str = "FRAMELOCK_BIND";
const ENV_CLIENTS: &str = "FRAMELOCK_CLIENTS";
const ENV_SERVER: &str = "FRAMELOCK_SERVER";
const ENV_TIMEOUT_MS: &str = "FRAMELOCK_TIMEOUT_MS";
const ENV_CONNECT_TIMEOUT_MS: &str = "FRAMELOCK_CONNECT_TIMEOUT_MS";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Jumlah client yang harus connect sebelum frame pertama
    pub expected_clients: usize,
    /// `None`: barrier menunggu tanpa batas
    pub barrier_timeout: Option<Duration>,
    /// SO_SNDBUF / SO_RCVBUF per client socket (unix)
    pub socket_buffer_size: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            expected_clients: 1,
            barrier_timeout: None,
            socket_buffer_size: Some(256 * 1024), // 256KB
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(addr) = lookup(ENV_BIND) {
            config.bind_addr = addr;
        }
        if let Some(n) = parse_var::<usize, _>(&lookup, ENV_CLIENTS)? {
            config.expected_clients = n;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_TIMEOUT_MS)? {
            config.barrier_timeout = millis(ms);
        }
        Ok(config)
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_addr: String,
    /// Berapa lama mencoba ulang connect yang ditolak; `None`: sekali saja
    pub connect_timeout: Option<Duration>,
    pub barrier_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            connect_timeout: Some(Duration::from_secs(30)),
            barrier_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(addr) = lookup(ENV_SERVER) {
            config.server_addr = addr;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_CONNECT_TIMEOUT_MS)? {
            config.connect_timeout = millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_TIMEOUT_MS)? {
            config.barrier_timeout = millis(ms);
        }
        Ok(config)
    }
}

/// Peran proses di cluster, tetap sejak session dibuat
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Role {
    Server(ServerConfig),
    Client(ClientConfig),
    /// Satu proses tanpa transport: sync hanya memindahkan queue lokal
    #[default]
    Standalone,
}

/// Apa yang dilakukan session ketika transport gagal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log lalu keluar dengan exit code 1
    #[default]
    Abort,
    /// Kembalikan error ke caller
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub role: Role,
    pub index_name: String,
    pub failure_policy: FailurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::Standalone,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            failure_policy: FailurePolicy::Abort,
        }
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
