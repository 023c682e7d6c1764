//! Shared configuration for the `conduit` client and the `conduitd` server.
//!
//! Both binaries load the same [`Config`] through `ortho_config`, layering
//! built-in defaults, an optional TOML file, `CONDUIT_*` environment variables
//! and command-line flags in increasing order of precedence. Agreeing on one
//! structure keeps the channel directory and timeouts consistent on both ends
//! of a FIFO exchange.

mod defaults;
mod formats;
mod paths;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_DRAIN_TIMEOUT_MS, DEFAULT_EXECUTION_TIMEOUT_MS,
    DEFAULT_LOG_FILTER, DEFAULT_RESPONSE_WRITE_TIMEOUT_MS, DEFAULT_STATUS_TIMEOUT_MS,
    default_channel_dir, default_dispatch_mode, default_log_filter, default_log_filter_string,
    default_log_format,
};
pub use formats::{DispatchMode, LogFormat, ValueParseError};
pub use paths::{ChannelPaths, ChannelPathsError, REQUEST_ALIAS_NAME};

/// Layered configuration shared by the client and the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CONDUIT")]
pub struct Config {
    /// Directory holding the request channel, response channels and the
    /// server's lock and pid files.
    #[ortho_config(default = default_channel_dir())]
    pub channel_dir: Utf8PathBuf,
    /// Milliseconds a client waits for the server to acknowledge a request.
    #[ortho_config(default = DEFAULT_ACK_TIMEOUT_MS)]
    pub ack_timeout_ms: u64,
    /// Milliseconds a client waits for the status token after the ack.
    #[ortho_config(default = DEFAULT_STATUS_TIMEOUT_MS)]
    pub status_timeout_ms: u64,
    /// Milliseconds a client tolerates a stalled payload before giving up.
    #[ortho_config(default = DEFAULT_DRAIN_TIMEOUT_MS)]
    pub drain_timeout_ms: u64,
    /// Milliseconds the server spends on one response write before abandoning it.
    #[ortho_config(default = DEFAULT_RESPONSE_WRITE_TIMEOUT_MS)]
    pub response_write_timeout_ms: u64,
    /// Milliseconds an external executor program may run before it is killed.
    #[ortho_config(default = DEFAULT_EXECUTION_TIMEOUT_MS)]
    pub execution_timeout_ms: u64,
    /// Whether the server executes requests on the loop thread or per request.
    #[ortho_config(default = default_dispatch_mode())]
    pub dispatch_mode: DispatchMode,
    /// Program that handles commands the built-in executor does not know.
    pub executor: Option<Utf8PathBuf>,
    /// Tracing filter applied by the server's subscriber.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for the server's structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_dir: default_channel_dir(),
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            status_timeout_ms: DEFAULT_STATUS_TIMEOUT_MS,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
            response_write_timeout_ms: DEFAULT_RESPONSE_WRITE_TIMEOUT_MS,
            execution_timeout_ms: DEFAULT_EXECUTION_TIMEOUT_MS,
            dispatch_mode: default_dispatch_mode(),
            executor: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads the configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads the configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name, matching
    /// [`std::env::args_os`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Directory holding every channel and server artefact.
    #[must_use]
    pub fn channel_dir(&self) -> &Utf8Path {
        self.channel_dir.as_path()
    }

    /// Deadline for the acknowledgement token.
    #[must_use]
    pub const fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Deadline for the status token once the ack has arrived.
    #[must_use]
    pub const fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    /// Longest stall tolerated while draining the payload.
    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Budget for writing one response back to a client.
    #[must_use]
    pub const fn response_write_timeout(&self) -> Duration {
        Duration::from_millis(self.response_write_timeout_ms)
    }

    /// Budget for one run of the external executor program.
    #[must_use]
    pub const fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    /// How the server schedules decoded requests.
    #[must_use]
    pub const fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch_mode
    }

    /// Program used for commands outside the built-in set, if configured.
    #[must_use]
    pub fn executor(&self) -> Option<&Utf8Path> {
        self.executor.as_deref()
    }

    /// Tracing filter for the server subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
