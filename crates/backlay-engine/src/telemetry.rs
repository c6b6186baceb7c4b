//! Tracing subscriber setup.

use backlay_types::{BacklayError, LoggingConfig, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. `RUST_LOG` overrides `config.level`.
///
/// # Errors
/// `Configuration` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.json {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };
    installed.map_err(|e| BacklayError::Configuration(format!("tracing init failed: {e}")))
}
