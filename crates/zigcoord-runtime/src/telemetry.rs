//! Tracing subscriber setup

use tracing::debug;
use tracing_subscriber::EnvFilter;

use zigcoord_core::{CoordError, CoordResult};

use crate::config::LoggingConfig;

/// Install the global subscriber
///
/// `RUST_LOG` wins over `config.filter`. Calling this when a subscriber is
/// already installed is not an error.
pub fn init_tracing(config: &LoggingConfig) -> CoordResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| CoordError::Config(format!("log filter {:?}: {}", config.filter, e)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        debug!("tracing subscriber already installed");
    }
    Ok(())
}
