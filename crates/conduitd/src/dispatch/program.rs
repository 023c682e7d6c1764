//! Runs commands through an external program.

use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{self, Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{debug, warn};

use conduit_protocol::{Command, Response, Status};

use super::DISPATCH_TARGET;
use super::executor::CommandExecutor;

const EXIT_POLL: Duration = Duration::from_millis(20);
/// How long the pipe readers get to finish once the process group is gone.
const KILL_GRACE: Duration = Duration::from_millis(200);

/// Executes each command as `program TOKEN...`.
///
/// Standard output becomes the payload. When the program fails, its standard
/// error follows the output and a final line names the exit status.
///
/// The program runs in its own process group. Anything still holding its
/// output pipes when the execution timeout expires, background children
/// included, is killed with the group.
#[derive(Debug, Clone)]
pub struct ProgramExecutor {
    program: PathBuf,
    timeout: Duration,
}

impl ProgramExecutor {
    /// Builds an executor that kills `program` once it runs past `timeout`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Program invoked for every command.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, command: &Command) -> Result<Response, ProgramError> {
        let deadline = Instant::now() + self.timeout;
        let mut child = process::Command::new(&self.program)
            .args(command.tokens())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|source| ProgramError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let group = ProcessGroup::of(&child);
        debug!(
            target: DISPATCH_TARGET,
            program = %self.program.display(),
            pid = child.id(),
            command = command.name(),
            "spawned executor program"
        );

        // Both pipes are drained while waiting so a chatty program never
        // blocks on a full pipe buffer.
        let stdout = collect_lines(child.stdout.take());
        let stderr = collect_lines(child.stderr.take());
        let status = self.wait_for_exit(&mut child, group, command, deadline)?;

        let mut lines = self.finish_lines(&stdout, group, command, deadline);
        if status.success() {
            return Ok(Response::new(Status::Ok, lines));
        }
        lines.extend(self.finish_lines(&stderr, group, command, deadline));
        lines.push(match status.code() {
            Some(code) => format!("command '{}' exited with status {code}", command.name()),
            None => format!("command '{}' was terminated by a signal", command.name()),
        });
        Ok(Response::new(Status::Error, lines))
    }

    fn wait_for_exit(
        &self,
        child: &mut Child,
        group: ProcessGroup,
        command: &Command,
        deadline: Instant,
    ) -> Result<ExitStatus, ProgramError> {
        loop {
            if let Some(status) = child.try_wait().map_err(ProgramError::Wait)? {
                debug!(
                    target: DISPATCH_TARGET,
                    command = command.name(),
                    ?status,
                    "executor program exited"
                );
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(
                    target: DISPATCH_TARGET,
                    command = command.name(),
                    timeout_ms = self.timeout_ms(),
                    "executor program timed out, killing process group"
                );
                group.kill();
                drop(child.wait());
                return Err(ProgramError::Timeout {
                    command: command.name().to_owned(),
                    timeout_ms: self.timeout_ms(),
                });
            }
            thread::sleep(EXIT_POLL);
        }
    }

    /// Collects one pipe's lines, killing the group if the pipe is still
    /// held open at `deadline`.
    fn finish_lines(
        &self,
        reader: &Receiver<Vec<String>>,
        group: ProcessGroup,
        command: &Command,
        deadline: Instant,
    ) -> Vec<String> {
        match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(lines) => lines,
            Err(RecvTimeoutError::Disconnected) => Vec::new(),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    target: DISPATCH_TARGET,
                    command = command.name(),
                    timeout_ms = self.timeout_ms(),
                    "executor output still open after exit, killing process group"
                );
                group.kill();
                reader.recv_timeout(KILL_GRACE).unwrap_or_default()
            }
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl CommandExecutor for ProgramExecutor {
    fn execute(&self, command: &Command) -> Response {
        self.run(command).unwrap_or_else(|error| {
            warn!(
                target: DISPATCH_TARGET,
                command = command.name(),
                error = %error,
                "executor program failed"
            );
            Response::error([error.to_string()])
        })
    }
}

/// Process group led by a spawned executor program.
#[derive(Debug, Clone, Copy)]
struct ProcessGroup(Option<Pid>);

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self(i32::try_from(child.id()).ok().map(Pid::from_raw))
    }

    fn kill(self) {
        let Some(pid) = self.0 else {
            return;
        };
        if let Err(errno) = killpg(pid, Signal::SIGKILL) {
            debug!(
                target: DISPATCH_TARGET,
                group = pid.as_raw(),
                error = %errno,
                "process group already gone"
            );
        }
    }
}

#[derive(Debug, Error)]
enum ProgramError {
    #[error("failed to start executor '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for executor: {0}")]
    Wait(#[source] io::Error),
    #[error("command '{command}' timed out after {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },
}

/// Reads `pipe` to its end on a helper thread; the lines arrive on the
/// returned channel once every writer has closed the pipe.
fn collect_lines<R>(pipe: Option<R>) -> Receiver<Vec<String>>
where
    R: Read + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            if let Err(error) = pipe.read_to_end(&mut bytes) {
                debug!(target: DISPATCH_TARGET, error = %error, "executor pipe read failed");
            }
            let lines = String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_owned)
                .collect();
            // The executor may have given up on this pipe already.
            drop(sender.send(lines));
        });
    }
    receiver
}
