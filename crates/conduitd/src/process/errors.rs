//! Defines the unified error surface for server launch and supervision.

use std::io;
use std::path::PathBuf;
use std::time::SystemTimeError;

use nix::errno::Errno;
use thiserror::Error;

use conduit_protocol::ChannelError;

use crate::bootstrap::BootstrapError;
use crate::dispatch::DispatchError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the server failed.
    #[error("server bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Lock file creation failed.
    #[error("failed to create lock file '{path}': {source}")]
    LockCreate {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A running server already holds the lock.
    #[error("server already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the existing pid file.
        pid: u32,
    },
    /// Another launch is still writing its pid file.
    #[error("server launch already in progress (lock: '{lock}')")]
    StartupInProgress {
        /// Lock file guarding the active launch.
        lock: PathBuf,
    },
    /// Removing a stale artefact failed.
    #[error("failed to remove stale file '{path}': {source}")]
    Cleanup {
        /// Path of the artefact that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the pid file failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the health snapshot failed.
    #[error("failed to write health snapshot '{path}': {source}")]
    HealthWrite {
        /// Health file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising the health snapshot failed.
    #[error("failed to serialise health snapshot: {source}")]
    HealthSerialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// Obtaining the current timestamp failed.
    #[error("failed to read system time: {source}")]
    Clock {
        /// Underlying system time error.
        #[source]
        source: SystemTimeError,
    },
    /// Probing an existing pid failed.
    #[error("failed to check existing process {pid}: {source}")]
    CheckProcess {
        /// Pid that failed to probe.
        pid: u32,
        /// Underlying OS error.
        source: Errno,
    },
    /// Health updates were attempted before writing the pid file.
    #[error("pid must be written before updating health state")]
    MissingPid,
    /// Installing the shutdown handlers failed.
    #[error("failed to install shutdown handlers: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// Creating or publishing the request channel failed.
    #[error("failed to open request channel: {source}")]
    RequestChannel {
        /// Underlying channel error.
        #[source]
        source: ChannelError,
    },
    /// The dispatch loop could not be started or stopped cleanly.
    #[error("dispatch loop failed: {source}")]
    Dispatch {
        /// Underlying dispatch error.
        #[source]
        source: DispatchError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<ChannelError> for LaunchError {
    fn from(source: ChannelError) -> Self {
        Self::RequestChannel { source }
    }
}

impl From<DispatchError> for LaunchError {
    fn from(source: DispatchError) -> Self {
        Self::Dispatch { source }
    }
}
