//! Server process supervision: singleton lock, pid and health files, and
//! shutdown handling.

mod errors;
mod files;
mod guard;
mod launch;
mod shutdown;

pub use errors::LaunchError;
pub(crate) use launch::{LaunchPlan, ServiceDeps, run_server_with};
pub use launch::run_server;
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
