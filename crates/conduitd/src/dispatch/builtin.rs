//! Commands the server answers itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use conduit_protocol::{Command, Response};

use super::DISPATCH_TARGET;
use super::executor::CommandExecutor;

/// Answers `ping`, `echo` and `shutdown`, delegating anything else to an
/// optional fallback executor.
pub struct BuiltinExecutor {
    stop: Arc<AtomicBool>,
    fallback: Option<Arc<dyn CommandExecutor>>,
}

impl BuiltinExecutor {
    /// Builds an executor whose `shutdown` command raises `stop`.
    #[must_use]
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self {
            stop,
            fallback: None,
        }
    }

    /// Routes commands outside the built-in set to `fallback`.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn CommandExecutor>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl CommandExecutor for BuiltinExecutor {
    fn execute(&self, command: &Command) -> Response {
        match command.name() {
            "ping" => Response::ok(["pong"]),
            "echo" => Response::ok([command.arguments().join(" ")]),
            "shutdown" => {
                info!(target: DISPATCH_TARGET, "shutdown requested by client");
                self.stop.store(true, Ordering::SeqCst);
                Response::ok(["stopping"])
            }
            name => match &self.fallback {
                Some(fallback) => fallback.execute(command),
                None => Response::error([format!("unknown command '{name}'")]),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use conduit_protocol::Status;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::dispatch::MockCommandExecutor;

    #[fixture]
    fn stop() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn command(tokens: &[&str]) -> Command {
        Command::new(tokens.iter().copied()).expect("valid command")
    }

    #[rstest]
    #[case(&["ping"], &["pong"])]
    #[case(&["echo", "hello", "world"], &["hello world"])]
    #[case(&["echo"], &[""])]
    fn answers_builtin_commands(
        stop: Arc<AtomicBool>,
        #[case] tokens: &[&str],
        #[case] expected: &[&str],
    ) {
        let response = BuiltinExecutor::new(stop).execute(&command(tokens));
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.lines(), expected);
    }

    #[rstest]
    fn shutdown_raises_the_stop_flag(stop: Arc<AtomicBool>) {
        let executor = BuiltinExecutor::new(Arc::clone(&stop));
        let response = executor.execute(&command(&["shutdown"]));
        assert_eq!(response.status(), Status::Ok);
        assert!(stop.load(Ordering::SeqCst));
    }

    #[rstest]
    fn unknown_command_without_fallback_is_an_error(stop: Arc<AtomicBool>) {
        let response = BuiltinExecutor::new(stop).execute(&command(&["frobnicate", "x"]));
        assert_eq!(response.status(), Status::Error);
        assert_eq!(response.lines(), ["unknown command 'frobnicate'"]);
    }

    #[rstest]
    fn unknown_command_goes_to_fallback(stop: Arc<AtomicBool>) {
        let mut fallback = MockCommandExecutor::new();
        fallback
            .expect_execute()
            .withf(|command| command.name() == "build" && command.arguments() == ["--release"])
            .times(1)
            .returning(|_| Response::ok(["built"]));
        let executor = BuiltinExecutor::new(stop).with_fallback(Arc::new(fallback));

        let response = executor.execute(&command(&["build", "--release"]));
        assert_eq!(response.lines(), ["built"]);
    }

    #[rstest]
    fn builtins_shadow_the_fallback(stop: Arc<AtomicBool>) {
        let mut fallback = MockCommandExecutor::new();
        fallback.expect_execute().never();
        let executor = BuiltinExecutor::new(stop).with_fallback(Arc::new(fallback));

        assert_eq!(executor.execute(&command(&["ping"])).lines(), ["pong"]);
    }
}
