//! Tracing setup.
//!
//! Standard output carries the JSON response, so logs always go to standard
//! error.

use std::io;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// `RUST_LOG` when set and valid, else the configured level, else `warn`.
pub fn log_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(config))
        .with_writer(io::stderr)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.with_ansi(false).compact().try_init()
    };
    installed.is_ok()
}
