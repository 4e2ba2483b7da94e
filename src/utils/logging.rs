//! Logging bootstrap
//!
//! Thin wrapper over tracing-subscriber so embedding applications and tests
//! get consistent structured output. Safe to call more than once.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber with `RUST_LOG` (default `info`)
pub fn init() {
    init_with_filter("info");
}

/// Initialize with an explicit default filter, still overridable by
/// `RUST_LOG`
pub fn init_with_filter(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
