//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr so the wrapped command's output stays clean.
//! `SIPHON_DEBUG=1` turns on debug logging; otherwise `SIPHON_LOG` takes an
//! `EnvFilter` directive and the default is `warn`.

use std::env;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SIPHON_LOG";
pub const DEBUG_ENV: &str = "SIPHON_DEBUG";

fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

pub fn env_filter() -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
