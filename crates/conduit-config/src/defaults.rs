use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

use crate::formats::{DispatchMode, LogFormat};

/// Default acknowledgement deadline in milliseconds.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 1_000;

/// Default status deadline in milliseconds.
pub const DEFAULT_STATUS_TIMEOUT_MS: u64 = 10_000;

/// Default payload stall tolerance in milliseconds.
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 1_000;

/// Default response write budget in milliseconds.
pub const DEFAULT_RESPONSE_WRITE_TIMEOUT_MS: u64 = 5_000;

/// Default executor program budget in milliseconds.
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 30_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default request scheduling mode for the server.
#[must_use]
pub const fn default_dispatch_mode() -> DispatchMode {
    DispatchMode::Serial
}

/// Computes the default channel directory.
///
/// Prefers `$XDG_RUNTIME_DIR/conduit`; falls back to a per-user directory
/// under the system temporary directory so users never share channels.
#[must_use]
pub fn default_channel_dir() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("conduit");
    if apply_namespace {
        base.push(user_namespace());
    }
    base
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(not(unix))]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    None
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn user_namespace() -> String {
    String::from("shared")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_dir_is_namespaced_under_conduit() {
        let dir = default_channel_dir();
        let tail = dir.file_name().expect("channel dir should have a tail");
        assert!(
            tail == "conduit" || tail.starts_with("uid-"),
            "unexpected channel dir tail: {tail}"
        );
    }
}
