//! Errors raised while creating, opening or using a FIFO channel.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures on the request or response channels.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No server holds the request channel open for reading.
    #[error("no server is reading requests at '{path}'")]
    ServerNotRunning {
        /// Alias or instance path that was tried.
        path: PathBuf,
    },
    /// The path exists but is not a FIFO.
    #[error("'{path}' is not a FIFO")]
    NotAFifo {
        /// Offending path.
        path: PathBuf,
    },
    /// The request channel has no room for another record right now.
    #[error("request channel '{path}' is full")]
    ChannelFull {
        /// Request channel path.
        path: PathBuf,
    },
    /// A record write delivered fewer bytes than requested.
    #[error("short write to '{path}': {written} of {expected} bytes")]
    ShortWrite {
        /// Channel path.
        path: PathBuf,
        /// Bytes accepted by the kernel.
        written: usize,
        /// Bytes in the record.
        expected: usize,
    },
    /// No client is reading the response channel.
    #[error("no client is reading response channel '{path}'")]
    NoReader {
        /// Response channel path.
        path: PathBuf,
    },
    /// A write could not make progress before its deadline.
    #[error("gave up writing to '{path}' after {timeout_ms} ms")]
    WriteTimedOut {
        /// Channel path.
        path: PathBuf,
        /// Budget that elapsed.
        timeout_ms: u64,
    },
    /// Creating the FIFO failed.
    #[error("failed to create FIFO '{path}': {source}")]
    Create {
        /// FIFO path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Opening the FIFO failed.
    #[error("failed to open '{path}': {source}")]
    Open {
        /// FIFO path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Reading from the FIFO failed.
    #[error("failed to read from '{path}': {source}")]
    Read {
        /// FIFO path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Writing to the FIFO failed.
    #[error("failed to write to '{path}': {source}")]
    Write {
        /// FIFO path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Pointing the stable alias at the instance channel failed.
    #[error("failed to publish request channel alias '{path}': {source}")]
    Alias {
        /// Alias path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ChannelError {
    /// Whether the failure means no server is listening, as opposed to a
    /// local filesystem problem.
    #[must_use]
    pub const fn is_server_absent(&self) -> bool {
        matches!(
            self,
            Self::ServerNotRunning { .. } | Self::NotAFifo { .. } | Self::ChannelFull { .. }
        )
    }
}
