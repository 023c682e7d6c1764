//! CLI argument definitions for the conduit client.

use clap::Parser;

/// Sends one command to the running conduit server.
#[derive(Parser, Debug)]
#[command(name = "conduit", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Publishes the command and exits without waiting for a response.
    #[arg(long)]
    pub(crate) no_wait: bool,
    /// Prints the exit code table and exits.
    #[arg(long)]
    pub(crate) exit_codes: bool,
    /// Command name followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) command: Vec<String>,
}

impl Cli {
    /// Returns true when neither a command nor `--exit-codes` was supplied.
    pub(crate) fn is_bare_invocation(&self) -> bool {
        self.command.is_empty() && !self.exit_codes
    }
}
