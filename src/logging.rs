//! Log output for binaries and tests.
//!
//! Library code only emits `tracing` events; with the `log-always` feature
//! they reach the `log` facade, which `env_logger` prints. `RUST_LOG`
//! overrides the default `info` filter.

use env_logger::{Builder, Env};

/// Install the global logger. Call once at startup.
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Install a test-friendly logger at debug level; repeated calls are
/// ignored.
pub fn init_for_tests() {
    let _ = Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
