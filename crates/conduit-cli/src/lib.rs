//! Command-line client for the conduit FIFO command protocol.
//!
//! `conduit` sends one command to the running `conduitd` server and exits
//! with a stable code describing the outcome. A blocking request creates a
//! private response channel, publishes a record naming it and then waits,
//! under separate deadlines, for the acknowledgement, the status and the
//! payload. Successful payload lines are copied to stdout; failed ones go to
//! stderr behind [`REMOTE_ERROR_MARKER`].
//!
//! The runtime is exercised both from the binary entrypoint and from tests
//! where configuration loading and output streams are substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches};
use conduit_protocol::{ClientId, Command, Status};

mod cli;
mod config;
mod errors;
mod exit;
mod logging;
mod output;
mod session;

use cli::Cli;
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
pub use exit::{ExitReason, exit_code_table};
pub use logging::{LOG_ENV_VAR, install_logging_from_env};
pub use output::REMOTE_ERROR_MARKER;
use output::PayloadWriter;
use session::Session;

/// Bundles the output streams handed to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        match self.execute(&args, &split) {
            Ok(reason) => reason.into(),
            Err(AppError::CliUsage(error)) => self.report_usage(&error),
            Err(error) => {
                let _ = writeln!(self.io.stderr, "conduit: {error}");
                error.exit_reason().into()
            }
        }
    }

    fn execute(
        &mut self,
        args: &[OsString],
        split: &ConfigArgumentSplit,
    ) -> Result<ExitReason, AppError> {
        let cli = parse_cli(split.cli_arguments(args)).map_err(AppError::CliUsage)?;
        if cli.exit_codes {
            write!(self.io.stdout, "{}", exit_code_table()).map_err(AppError::Output)?;
            return Ok(ExitReason::Success);
        }
        if cli.is_bare_invocation() {
            self.write_bare_usage()?;
            return Ok(ExitReason::Validation);
        }

        let command = Command::new(cli.command)?;
        let config = self.loader.load(&split.config_arguments)?;
        let session = Session::from_config(&config)?;
        if cli.no_wait {
            session.notify(command)?;
            return Ok(ExitReason::Success);
        }

        let mut writer = PayloadWriter::new(&mut *self.io.stdout, &mut *self.io.stderr);
        let status = session.request(ClientId::current_process(), command, |status, line| {
            writer.line(status, line)
        })?;
        writer.finish(status).map_err(AppError::Output)?;
        Ok(match status {
            Status::Ok => ExitReason::Success,
            Status::Error => ExitReason::RemoteError,
        })
    }

    fn report_usage(&mut self, error: &clap::Error) -> ExitCode {
        // Help and version requests are clap "errors" destined for stdout.
        if error.use_stderr() {
            let _ = write!(self.io.stderr, "{}", error.render());
            ExitReason::Validation.into()
        } else {
            let _ = write!(self.io.stdout, "{}", error.render());
            ExitReason::Success.into()
        }
    }

    fn write_bare_usage(&mut self) -> Result<(), AppError> {
        let usage = Cli::command().render_usage();
        writeln!(
            self.io.stderr,
            "{usage}\n\nRun 'conduit --help' for options and exit codes."
        )
        .map_err(AppError::Output)
    }
}

fn parse_cli(arguments: Vec<OsString>) -> Result<Cli, clap::Error> {
    let matches = Cli::command()
        .after_help(exit_code_table())
        .try_get_matches_from(arguments)?;
    Cli::from_arg_matches(&matches)
}

/// Runs the CLI using the provided arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(IoStreams::new(stdout, stderr), loader).run(args)
}
