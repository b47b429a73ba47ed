//! Structured logging setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber: `RUST_LOG` controls the filter,
/// defaulting to `info`. Thread names matter here because the runtime is
/// exactly two threads talking across a channel.
pub fn init() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init()
}
