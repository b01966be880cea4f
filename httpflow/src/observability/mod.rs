//! Logging setup.
//!
//! The library only emits `tracing` events; applications decide where they
//! go. These helpers install a `tracing-subscriber` formatter that honours
//! `RUST_LOG` and falls back to the given level.

use crate::config::ClientConfig;
use crate::errors::HttpflowError;
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` if set, `level` otherwise.
pub fn env_filter(level: &str) -> Result<EnvFilter, HttpflowError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| HttpflowError::Config(format!("invalid log filter `{level}`: {e}"))),
    }
}

/// Installs the global subscriber.
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_logging(level: &str, json: bool) -> Result<(), HttpflowError> {
    let filter = env_filter(level)?;
    let installed = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };
    installed.map_err(|e| HttpflowError::Config(format!("logging already initialised: {e}")))
}

/// Installs the global subscriber described by a client configuration.
pub fn init_from_config(config: &ClientConfig) -> Result<(), HttpflowError> {
    init_logging(&config.log_level, config.log_json)
}
