//! Test helpers for the dispatch module.

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use conduit_protocol::{Command, Response};

use super::CommandExecutor;

/// Executor that panics with a fixed message.
pub(crate) struct PanickingExecutor {
    message: &'static str,
}

impl PanickingExecutor {
    pub(crate) const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl CommandExecutor for PanickingExecutor {
    fn execute(&self, _command: &Command) -> Response {
        panic!("{}", self.message);
    }
}

/// Executor that answers `explode` by panicking, `fail` with an error and
/// everything else by echoing the tokens, recording each command it sees.
#[derive(Default)]
pub(crate) struct RecordingExecutor {
    seen: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl RecordingExecutor {
    /// Sleeps for `delay` before answering, to hold requests in flight.
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            seen: Mutex::default(),
            delay: Some(delay),
        }
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("executor mutex poisoned").clone()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, command: &Command) -> Response {
        self.seen
            .lock()
            .expect("executor mutex poisoned")
            .push(command.to_string());
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        match command.name() {
            "explode" => panic!("executor exploded"),
            "fail" => Response::error(command.arguments().iter().map(String::as_str)),
            _ => Response::ok([command.to_string()]),
        }
    }
}
