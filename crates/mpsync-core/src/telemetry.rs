//! Tracing subscriber setup shared by binaries and harnesses.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LogConfig;

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "MPSYNC_LOG";

/// Install the global tracing subscriber.
///
/// `MPSYNC_LOG` takes precedence over `config.level`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_ansi(false))
            .try_init()
            .is_ok()
    } else {
        registry.with(fmt::layer().compact()).try_init().is_ok()
    }
}
