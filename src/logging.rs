//! Tracing subscriber setup
//!
//! Logs go to stderr so stdout only carries CSV output.

use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber
///
/// Respects `RUST_LOG` if set, otherwise uses `level`. Calling this twice
/// keeps the first subscriber.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
