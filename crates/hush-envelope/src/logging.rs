//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, LoggingConfig};

/// Build the filter for `config`. `RUST_LOG` takes precedence when set.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the level is not a valid filter directive.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    parse_filter(&config.level)
}

/// Parse a filter directive string such as `warn` or `hush_envelope=debug,warn`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if `directives` does not parse.
pub fn parse_filter(directives: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(directives).map_err(|e| ConfigError::Invalid(format!("log level {directives}: {e}")))
}

/// Install a global fmt subscriber.
///
/// Returns `Ok(false)` if a global subscriber was already installed.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the level is not a valid filter directive.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = env_filter(config)?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}
