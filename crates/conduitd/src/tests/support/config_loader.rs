//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use camino::Utf8PathBuf;
use conduit_config::{ChannelPaths, Config, DispatchMode};
use ortho_config::OrthoError;
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that places the channel directory under a temporary directory.
///
/// Clones share the directory, which is removed with the last clone.
#[derive(Clone)]
pub struct TestConfigLoader {
    dir: Arc<TempDir>,
    dispatch_mode: DispatchMode,
    executor: Option<Utf8PathBuf>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary channel directory");
        Self {
            dir: Arc::new(dir),
            dispatch_mode: DispatchMode::Serial,
            executor: None,
        }
    }

    #[must_use]
    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, program: &Path) -> Self {
        let program = Utf8PathBuf::from_path_buf(program.to_path_buf())
            .expect("executor path was not valid UTF-8");
        self.executor = Some(program);
        self
    }

    /// Root of the temporary tree; the channel directory lives beneath it.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    fn channel_dir(&self) -> Utf8PathBuf {
        let path = self.dir.path().join("channels");
        Utf8PathBuf::from_path_buf(path).expect("temporary channel path was not valid UTF-8")
    }

    /// Paths the server will derive from this loader's configuration.
    #[must_use]
    pub fn paths(&self) -> ChannelPaths {
        ChannelPaths::under(self.channel_dir().as_std_path())
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            channel_dir: self.channel_dir(),
            ack_timeout_ms: 1_000,
            status_timeout_ms: 5_000,
            drain_timeout_ms: 1_000,
            response_write_timeout_ms: 1_000,
            execution_timeout_ms: 2_000,
            dispatch_mode: self.dispatch_mode,
            executor: self.executor.clone(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing a non-numeric timeout.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("conduitd"),
            OsString::from("--ack-timeout-ms"),
            OsString::from("soon"),
        ];
        Config::load_from_iter(args)
    }
}
