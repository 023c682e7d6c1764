//! The seam between the dispatch loop and whatever runs a command.

use std::sync::Arc;

use conduit_protocol::{Command, Response};

/// Executes one validated command and describes the outcome.
///
/// Implementations report every failure, including their own, as an error
/// [`Response`]; the request loop never sees an `Err`. They must be shareable
/// across threads because concurrent dispatch runs each request on its own
/// worker.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor: Send + Sync {
    /// Runs `command` to completion.
    fn execute(&self, command: &Command) -> Response;
}

impl<T> CommandExecutor for Arc<T>
where
    T: CommandExecutor + ?Sized,
{
    fn execute(&self, command: &Command) -> Response {
        (**self).execute(command)
    }
}
