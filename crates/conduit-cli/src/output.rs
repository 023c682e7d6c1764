//! Routes response payload lines to the caller's streams.

use std::io::{self, Write};

use conduit_protocol::Status;

/// Prefix written before every line of a failed response.
pub const REMOTE_ERROR_MARKER: &str = "conduit: remote error: ";

/// Stands in for the payload of a failed response that carried no lines.
const BARE_FAILURE: &str = "command failed";

/// Writes successful payload lines to stdout and failed ones, marked, to
/// stderr.
pub(crate) struct PayloadWriter<'a, W: Write, E: Write> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    written: usize,
}

impl<'a, W: Write, E: Write> PayloadWriter<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdout,
            stderr,
            written: 0,
        }
    }

    pub(crate) fn line(&mut self, status: Status, line: &str) -> io::Result<()> {
        self.written += 1;
        match status {
            Status::Ok => writeln!(self.stdout, "{line}"),
            Status::Error => writeln!(self.stderr, "{REMOTE_ERROR_MARKER}{line}"),
        }
    }

    /// Flushes both streams. A failure without payload still gets one
    /// marked line, so stderr always shows the server rejected the command.
    pub(crate) fn finish(&mut self, status: Status) -> io::Result<()> {
        if status == Status::Error && self.written == 0 {
            writeln!(self.stderr, "{REMOTE_ERROR_MARKER}{BARE_FAILURE}")?;
        }
        self.stdout.flush()?;
        self.stderr.flush()
    }
}
