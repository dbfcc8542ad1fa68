//! Tracing subscriber setup for binaries and demos
//!
//! The library itself only emits `tracing` events and spans; installing a
//! subscriber is left to the process embedding it.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::{Error, Result};

/// Install a stdout fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info"` or `"telemetry_trending=debug"`).
///
/// Returns `Ok(false)` if a global subscriber was already installed.
///
/// # Errors
///
/// Returns [`Error::Config`] if `default_directive` does not parse.
pub fn init_tracing(default_directive: &str) -> Result<bool> {
    let directive: Directive = default_directive
        .parse()
        .map_err(|e| Error::Config(format!("invalid log directive '{default_directive}': {e}")))?;

    let filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let stdout = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(filter);

    Ok(tracing_subscriber::registry().with(stdout).try_init().is_ok())
}
