//! Tracing/logging initialization.
//!
//! JSON lines with timestamps and targets. Audit records go out on the
//! `audit` target, so `RUST_LOG=audit=info` isolates the trail.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Initialize tracing with `RUST_LOG`, falling back to `info`.
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Initialize tracing with `RUST_LOG`, falling back to `default_filter`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with_default(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init()
        .is_ok()
}
