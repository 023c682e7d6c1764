//! Server side of the conduit FIFO command protocol.
//!
//! `conduitd` owns a single request channel in the configured channel
//! directory and publishes it under a stable alias. Clients append one record
//! per request; the dispatch loop decodes each record, acknowledges waiting
//! clients on their private response channel, executes the command and writes
//! the status and payload back.
//!
//! Startup follows a fixed sequence: configuration is loaded through
//! [`conduit_config`], structured telemetry is installed, the channel
//! directory is prepared and a singleton lock is taken before the request
//! channel is created. Health reporting hooks emit structured events at each
//! stage so a misbehaving client or executor is visible in the logs without
//! ever stopping the loop.

mod bootstrap;
mod dispatch;
mod health;
mod process;
mod telemetry;

pub use bootstrap::{BootstrapError, ConfigLoader, Server, SystemConfigLoader, bootstrap_with};
pub use dispatch::{BuiltinExecutor, CommandExecutor, DispatchError, ProgramExecutor};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, run_server};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
