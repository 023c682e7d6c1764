//! Error types for the request loop.

use std::io;

use thiserror::Error;

/// Errors surfaced while starting or stopping the request loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The loop thread could not be spawned.
    #[error("failed to spawn request loop thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The loop thread panicked.
    #[error("request loop thread panicked")]
    ThreadPanic,
}
