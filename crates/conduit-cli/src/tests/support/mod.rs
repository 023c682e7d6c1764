//! Test support utilities for conduit client behavioural coverage.
//!
//! Supplies a scripted fake server and a world that runs the CLI against it
//! with captured output, so step definitions and unit tests stay focused on
//! their assertions.

mod fake_server;

use std::ffi::OsString;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use camino::Utf8PathBuf;
use conduit_config::{ChannelPaths, Config};
use tempfile::TempDir;

use crate::{AppError, ConfigLoader, run_with_loader};

pub(super) use self::fake_server::{FakeServer, Script};

const RECORD_WAIT: Duration = Duration::from_secs(2);

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Loader that always fails, as a broken configuration file would.
pub(super) struct BrokenConfigLoader;

impl ConfigLoader for BrokenConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        let args = ["conduit", "--ack-timeout-ms", "soon"];
        Config::load_from_iter(args.map(OsString::from)).map_err(AppError::LoadConfiguration)
    }
}

/// Configuration with short deadlines rooted in `channel_dir`.
pub(super) fn quick_config(channel_dir: &std::path::Path) -> Result<Config> {
    let channel_dir = Utf8PathBuf::from_path_buf(channel_dir.to_path_buf())
        .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir: {}", path.display()))?;
    Ok(Config {
        channel_dir,
        ack_timeout_ms: 300,
        status_timeout_ms: 300,
        drain_timeout_ms: 200,
        ..Config::default()
    })
}

pub(super) struct TestWorld {
    // Declared first so the server stops before its directory is removed.
    pub server: Option<FakeServer>,
    pub dir: TempDir,
    pub config: Config,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
}

impl TestWorld {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create channel dir")?;
        let config = quick_config(dir.path())?;
        Ok(Self {
            server: None,
            dir,
            config,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        })
    }

    pub fn paths(&self) -> ChannelPaths {
        ChannelPaths::under(self.dir.path())
    }

    pub fn start_server(&mut self, script: Script) -> Result<()> {
        let server = FakeServer::spawn(&self.paths(), script)?;
        self.server = Some(server);
        Ok(())
    }

    pub fn run(&mut self, command: &str) {
        self.stdout.clear();
        self.stderr.clear();
        let args = Self::build_args(command);
        let loader = StaticConfigLoader::new(self.config.clone());
        let exit = run_with_loader(args, &mut self.stdout, &mut self.stderr, &loader);
        self.exit_code = Some(exit);
    }

    fn build_args(command: &str) -> Vec<OsString> {
        let mut tokens = command.split_whitespace().map(OsString::from);
        let mut args = vec![OsString::from("conduit")];
        // Scenarios spell out the program name; skip it when present.
        if let Some(first) = tokens.next()
            && first != "conduit"
        {
            args.push(first);
        }
        args.extend(tokens);
        args
    }

    pub fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout utf8")
    }

    pub fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr utf8")
    }

    pub fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::from(expected),
            "expected exit code {expected}, got {exit:?}; stderr: {:?}",
            self.stderr_text().unwrap_or_default()
        );
        Ok(())
    }

    /// Records the fake server has seen, waiting briefly for `count`.
    pub fn server_records(&self, count: usize) -> Result<Vec<String>> {
        self.server
            .as_ref()
            .context("no fake server running")?
            .wait_for_records(count, RECORD_WAIT)
    }
}
