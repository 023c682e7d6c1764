//! Server bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use conduit_config::{ChannelPaths, ChannelPathsError, Config};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the server configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the layered configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// No layer of the configuration could be merged.
    #[error("configuration could not be loaded: {source}")]
    Configuration {
        /// Error reported by `ortho_config`.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The log filter or subscriber was rejected.
    #[error("telemetry could not be installed: {source}")]
    Telemetry {
        /// Cause reported by the telemetry layer.
        #[source]
        source: TelemetryError,
    },
    /// The channel directory could not be prepared.
    #[error("failed to prepare channel directory: {source}")]
    Channels {
        /// Filesystem error reported while preparing the directory.
        #[source]
        source: ChannelPathsError,
    },
}

/// A bootstrapped server, ready to take the singleton lock.
pub struct Server {
    config: Config,
    paths: ChannelPaths,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Server {
    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Channel paths derived from the configuration.
    #[must_use]
    pub fn paths(&self) -> &ChannelPaths {
        &self.paths
    }

    /// Proof that the tracing subscriber is installed.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Reporter shared with the dispatch loop.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }
}

/// Loads configuration, installs telemetry and prepares the channel
/// directory, reporting each stage through `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Server, BootstrapError> {
    reporter.bootstrap_starting();
    let report = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| report(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| report(BootstrapError::Telemetry { source }))?;
    let paths = ChannelPaths::from_config(&config)
        .map_err(|source| report(BootstrapError::Channels { source }))?;

    reporter.bootstrap_succeeded(&config);
    Ok(Server {
        config,
        paths,
        telemetry,
        reporter,
    })
}
