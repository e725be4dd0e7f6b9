use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "DATAPACK_LOG";

/// Represents errors that can occur while installing the logger.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured filter directive does not parse.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter { filter: String, reason: String },
    /// Another subscriber was installed first.
    #[error("a global logger is already installed")]
    AlreadyInstalled,
}

/// Builds the filter: `DATAPACK_LOG` if set and valid, else `configured`.
pub fn build_filter(configured: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(configured).map_err(|err| LoggingError::InvalidFilter {
        filter: configured.to_string(),
        reason: err.to_string(),
    })
}

/// Installs the global `tracing` subscriber, writing to stderr.
pub fn init_logging(configured: &str) -> Result<(), LoggingError> {
    let filter = build_filter(configured)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("warn,datapack_studio=debug").is_ok());
    }

    #[test]
    fn rejects_malformed_filter() {
        if std::env::var(LOG_ENV).is_ok() {
            return;
        }
        assert!(matches!(
            build_filter("datapack_studio=loud"),
            Err(LoggingError::InvalidFilter { .. })
        ));
    }
}
