use std::ffi::c_int;
use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;
use tracing::debug;

use super::PROCESS_TARGET;

const TERMINATION_SIGNALS: [c_int; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Abstraction over shutdown notification mechanisms.
///
/// Implementations raise `stop` once the server should wind down. The
/// dispatch loop observes the same flag that the `shutdown` command sets, so
/// both paths end the run identically.
pub trait ShutdownSignal: Send + Sync {
    /// Arranges for `stop` to be raised when shutdown is requested.
    fn install(&self, stop: &Arc<AtomicBool>) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Raises the stop flag on SIGTERM, SIGINT, SIGQUIT or SIGHUP.
///
/// A second signal while the server is already stopping terminates the
/// process immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self, stop: &Arc<AtomicBool>) -> Result<(), ShutdownError> {
        for signal in TERMINATION_SIGNALS {
            // Registered first so it sees the flag before this signal sets it.
            flag::register_conditional_shutdown(signal, 1, Arc::clone(stop))
                .and_then(|_| flag::register(signal, Arc::clone(stop)))
                .map_err(|source| ShutdownError::Install { source })?;
        }
        debug!(
            target: PROCESS_TARGET,
            signals = ?TERMINATION_SIGNALS,
            "termination signal handlers installed"
        );
        Ok(())
    }
}
