//! Structured telemetry for the server.
//!
//! Logs always go to stderr so the request and response channels stay free of
//! diagnostic noise. Dispatch workers are named threads, so thread names are
//! included to tell concurrent requests apart.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use conduit_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned once telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression did not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Filter expression taken from the configuration.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Installing the global subscriber failed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls return a fresh handle without touching global state, so
/// bootstrapping several servers in one process (as the tests do) is safe.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| {
            let subscriber = build_subscriber(config)?;
            tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
        })
        .map(|_| TelemetryHandle)
}

fn build_subscriber(config: &Config) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: config.log_filter().to_owned(),
        message: error.to_string(),
    })?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(LogFormat::Json)]
    #[case(LogFormat::Compact)]
    fn builds_subscriber_for_each_format(#[case] log_format: LogFormat) {
        let config = Config {
            log_format,
            log_filter: "conduitd=debug,warn".to_owned(),
            ..Config::default()
        };
        assert!(build_subscriber(&config).is_ok());
    }

    #[rstest]
    fn rejects_malformed_filter() {
        let config = Config {
            log_filter: "conduitd=loudest".to_owned(),
            ..Config::default()
        };
        let Err(error) = build_subscriber(&config) else {
            panic!("malformed filter should be rejected");
        };
        assert!(matches!(error, TelemetryError::Filter { ref filter, .. } if filter == "conduitd=loudest"));
    }
}
