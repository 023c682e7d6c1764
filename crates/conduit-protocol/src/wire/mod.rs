//! Tokens exchanged on a response channel.
//!
//! A response is the ack token, a status token and zero or more
//! newline-terminated payload lines, in that order. The server closes its end
//! after the last line; end-of-data is the only payload terminator.

use std::fmt;

/// Length of every handshake token.
pub const TOKEN_LEN: usize = 3;

/// Acknowledges receipt of a request.
pub const ACK_TOKEN: &[u8; TOKEN_LEN] = b"ACK";

/// The command succeeded.
pub const SUCCESS_TOKEN: &[u8; TOKEN_LEN] = b"SUC";

/// The command failed; the payload carries diagnostics.
pub const ERROR_TOKEN: &[u8; TOKEN_LEN] = b"ERR";

/// Outcome of an executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The command succeeded.
    Ok,
    /// The command failed.
    Error,
}

impl Status {
    /// Wire token for this status.
    #[must_use]
    pub const fn token(self) -> &'static [u8; TOKEN_LEN] {
        match self {
            Self::Ok => SUCCESS_TOKEN,
            Self::Error => ERROR_TOKEN,
        }
    }

    /// Parses a status token; anything else is `None`.
    #[must_use]
    pub fn from_token(bytes: &[u8]) -> Option<Self> {
        if bytes == SUCCESS_TOKEN {
            Some(Self::Ok)
        } else if bytes == ERROR_TOKEN {
            Some(Self::Error)
        } else {
            None
        }
    }

    /// Whether the command succeeded.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Ok => "ok",
            Self::Error => "error",
        })
    }
}

/// Status and payload produced by executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    lines: Vec<String>,
}

impl Response {
    /// Builds a response from a status and its lines.
    #[must_use]
    pub const fn new(status: Status, lines: Vec<String>) -> Self {
        Self { status, lines }
    }

    /// A successful response.
    #[must_use]
    pub fn ok<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Status::Ok, lines.into_iter().map(Into::into).collect())
    }

    /// A failed response with diagnostic lines.
    #[must_use]
    pub fn error<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Status::Error, lines.into_iter().map(Into::into).collect())
    }

    /// Outcome of the command.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Payload lines without their terminators.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Status token followed by every line, each newline-terminated.
    ///
    /// A line that already ends in a newline is not given a second one.
    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        let payload_len: usize = self.lines.iter().map(|line| line.len() + 1).sum();
        let mut body = Vec::with_capacity(TOKEN_LEN + payload_len);
        body.extend_from_slice(self.status.token());
        for line in &self.lines {
            body.extend_from_slice(line.strip_suffix('\n').unwrap_or(line).as_bytes());
            body.push(b'\n');
        }
        body
    }
}

#[cfg(test)]
mod tests;
