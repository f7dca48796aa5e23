//! Logging setup
//!
//! Filter dari `RUST_LOG`, default `framelock=info`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "framelock=info";

/// Pasang global subscriber; aman dipanggil lebih dari sekali
///
/// Return `false` jika subscriber lain sudah terpasang.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
