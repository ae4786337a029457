//! Logging setup shared by the library's consumers.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging at WARN, overridable with RUST_LOG.
///
/// Recoveries applied by an [`Evaluator`](crate::Evaluator) log at WARN, so
/// they show by default.
pub fn init() {
    init_with_level("warn")
}

/// Initialize logging with a specific default level
/// (`trace`, `debug`, `info`, `warn` or `error`).
///
/// RUST_LOG still takes precedence.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
