//! Configuration errors must stop loading instead of falling back to defaults.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use conduit_config::Config;
use once_cell::sync::Lazy;
use ortho_config::OrthoError;
use rstest::{fixture, rstest};
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Serialises environment access and restores every variable it touched.
struct EnvScope {
    saved: Vec<(&'static str, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvScope {
    fn set(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.saved.push((key, std::env::var_os(key)));
        // Edition 2024 marks this unsafe; the lock keeps tests in this binary apart.
        unsafe { std::env::set_var(key, value.into()) };
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn env() -> EnvScope {
    EnvScope {
        saved: Vec::new(),
        _lock: ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner),
    }
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write configuration file");
    path
}

fn file_paths(error: &OrthoError) -> Vec<PathBuf> {
    let OrthoError::Aggregate(errors) = error else {
        panic!("expected aggregated error, got {error:?}");
    };
    errors
        .iter()
        .filter_map(|inner| match inner {
            OrthoError::File { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect()
}

#[rstest]
fn every_broken_file_is_reported(mut env: EnvScope) {
    let dir = TempDir::new().expect("temp dir");
    let flag_file = write_file(&dir, "flag.toml", "ack_timeout_ms = \"soon\"\n");
    let env_file = write_file(&dir, "env.toml", "drain_timeout_ms = [1, 2]\n");
    env.set("CONDUIT_CONFIG_PATH", env_file.as_os_str());

    let error = Config::load_from_iter([
        OsString::from("conduitd"),
        OsString::from("--config-path"),
        flag_file.clone().into_os_string(),
    ])
    .expect_err("broken files must not load");

    assert!(
        error.to_string().contains("multiple configuration errors"),
        "unexpected message: {error}"
    );
    let paths = file_paths(&error);
    assert!(paths.contains(&flag_file), "flag file missing from {paths:?}");
    assert!(paths.contains(&env_file), "env file missing from {paths:?}");
}

#[rstest]
#[case::dispatch_mode("CONDUIT_DISPATCH_MODE", "parallel")]
#[case::log_format("CONDUIT_LOG_FORMAT", "yaml")]
#[case::ack_timeout("CONDUIT_ACK_TIMEOUT_MS", "soon")]
fn invalid_environment_values_fail(
    mut env: EnvScope,
    #[case] key: &'static str,
    #[case] value: &str,
) {
    env.set(key, value);

    let result = Config::load_from_iter([OsString::from("conduit")]);

    assert!(result.is_err(), "{key}={value} should be rejected");
}

#[rstest]
fn invalid_flag_value_fails(env: EnvScope) {
    let _scope = env;

    let result = Config::load_from_iter(["conduit", "--status-timeout-ms", "-5"].map(OsString::from));

    assert!(result.is_err(), "negative timeout should be rejected");
}
