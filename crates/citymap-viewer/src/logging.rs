//! Logging initialization
//!
//! Logs go to stderr so stdout stays machine-readable in `--json` mode.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter when `RUST_LOG` is unset
fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,reqwest=info,hyper_util=info"
    } else {
        "info"
    }
}

/// Initialize the global subscriber from `RUST_LOG`
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);
    // A second initialization (tests) keeps the first subscriber
    if tracing_subscriber::registry().with(fmt_layer).try_init().is_ok() {
        tracing::debug!("Logging initialized");
    }
}
