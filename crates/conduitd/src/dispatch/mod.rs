//! Request dispatch for the server.
//!
//! The request loop reads one record at a time from the request channel and
//! hands each line to the [`RequestHandler`]. The handler decodes the record,
//! acknowledges a waiting client on its response channel, runs the command
//! through a [`CommandExecutor`] and writes the status and payload back.
//! Records addressed to the anonymous sentinel are executed without ever
//! touching a response channel.
//!
//! Nothing a client or executor does can stop the loop: malformed records,
//! vanished clients, slow readers and panicking executors are logged and the
//! loop moves on to the next record.

mod builtin;
mod errors;
mod executor;
mod handler;
mod program;
mod request_loop;
#[cfg(test)]
mod test_utils;

pub use self::builtin::BuiltinExecutor;
pub use self::errors::DispatchError;
#[cfg(test)]
pub(crate) use self::executor::MockCommandExecutor;
pub use self::executor::CommandExecutor;
pub(crate) use self::handler::RequestHandler;
pub use self::program::ProgramExecutor;
pub(crate) use self::request_loop::{DispatchHandle, RequestLoop};
#[cfg(test)]
pub(crate) use self::test_utils::{PanickingExecutor, RecordingExecutor};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
