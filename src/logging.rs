//! Subscriber setup for the command-line tool
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary (or a test) through [`init_tracing`].

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

/// Fallback directive for a `-v` count when `RUST_LOG` is unset
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` if it parses, otherwise the level chosen by `verbosity`
pub fn resolve_filter(verbosity: u8) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_directive(verbosity)),
    }
}

/// Installs a global fmt subscriber writing to stderr.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(verbosity: u8) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_fmt()
        .with_env_filter(resolve_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish()
        .try_init()
}
