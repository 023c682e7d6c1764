//! CLI entrypoint for the conduit client.
//!
//! The binary delegates to [`conduit_cli::run`], which splits configuration
//! flags from the command, publishes the request to `conduitd` and forwards
//! the response.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    conduit_cli::install_logging_from_env();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    conduit_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
