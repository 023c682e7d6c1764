//! Derives the channel paths shared by the client and the server.
//!
//! The channel directory houses the server's request channel, its stable
//! alias, one response channel per waiting client and the server's lock, pid
//! and health files. Both binaries must agree on this layout, so every name is
//! derived here and nowhere else.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

/// File name of the stable request channel alias inside the channel directory.
pub const REQUEST_ALIAS_NAME: &str = "conduitd.fifo";

const LOCK_FILE_NAME: &str = "conduitd.lock";
const PID_FILE_NAME: &str = "conduitd.pid";
const HEALTH_FILE_NAME: &str = "conduitd.health";

/// Canonical paths for every channel and server artefact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPaths {
    channel_dir: PathBuf,
    request_alias: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
}

impl ChannelPaths {
    /// Derives the paths from the shared configuration and ensures the
    /// channel directory exists with owner-only permissions.
    pub fn from_config(config: &Config) -> Result<Self, ChannelPathsError> {
        let paths = Self::under(config.channel_dir().as_std_path());
        paths.prepare_directory()?;
        Ok(paths)
    }

    /// Derives the paths beneath `channel_dir` without touching the
    /// filesystem.
    #[must_use]
    pub fn under(channel_dir: &Path) -> Self {
        Self {
            request_alias: channel_dir.join(REQUEST_ALIAS_NAME),
            lock_path: channel_dir.join(LOCK_FILE_NAME),
            pid_path: channel_dir.join(PID_FILE_NAME),
            health_path: channel_dir.join(HEALTH_FILE_NAME),
            channel_dir: channel_dir.to_path_buf(),
        }
    }

    /// Directory holding every channel.
    #[must_use]
    pub fn channel_dir(&self) -> &Path {
        self.channel_dir.as_path()
    }

    /// Stable alias clients publish requests through.
    #[must_use]
    pub fn request_alias(&self) -> &Path {
        self.request_alias.as_path()
    }

    /// Request channel owned by the server instance running as `pid`.
    #[must_use]
    pub fn instance_channel(&self, pid: u32) -> PathBuf {
        self.channel_dir.join(format!("conduitd-{pid}.fifo"))
    }

    /// Response channel owned by the client whose identifier is `client_id`.
    #[must_use]
    pub fn response_channel(&self, client_id: u32) -> PathBuf {
        self.channel_dir.join(format!("client-{client_id}.fifo"))
    }

    /// Lock file guarding singleton server startup.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// File recording the running server's pid.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// JSON snapshot of the server's lifecycle state.
    #[must_use]
    pub fn health_path(&self) -> &Path {
        self.health_path.as_path()
    }

    fn prepare_directory(&self) -> Result<(), ChannelPathsError> {
        if self.channel_dir.as_os_str().is_empty() {
            return Err(ChannelPathsError::EmptyDirectory);
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(&self.channel_dir)
            && source.kind() != io::ErrorKind::AlreadyExists
        {
            return Err(ChannelPathsError::CreateDirectory {
                path: self.channel_dir.clone(),
                source,
            });
        }
        Ok(())
    }
}

/// Errors raised while preparing the channel directory.
#[derive(Debug, Error)]
pub enum ChannelPathsError {
    /// The configured channel directory was empty.
    #[error("channel directory must not be empty")]
    EmptyDirectory,
    /// Creating the channel directory failed.
    #[error("failed to prepare channel directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
}
