//! Opt-in diagnostics for the client.
//!
//! Stdout and stderr carry the forwarded payload, so no subscriber is
//! installed unless `CONDUIT_LOG` names a filter.

use std::io;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the client's log filter.
pub const LOG_ENV_VAR: &str = "CONDUIT_LOG";

const FALLBACK_FILTER: &str = "warn";

/// Installs a compact stderr subscriber when [`LOG_ENV_VAR`] is set.
///
/// An unparsable filter falls back to warnings only.
pub fn install_logging_from_env() {
    let Some(value) = std::env::var_os(LOG_ENV_VAR) else {
        return;
    };
    let filter = EnvFilter::try_new(value.to_string_lossy())
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .compact()
        .try_init();
    if installed.is_err() {
        tracing::debug!("a global subscriber was already installed");
    }
}
