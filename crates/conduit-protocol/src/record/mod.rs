//! Request records: `<client-id-or-"-"> <token> <token> ...\n`.
//!
//! A record names the waiting client whose response channel should receive
//! the answer, or carries [`ANONYMOUS_SENTINEL`] for fire-and-forget requests.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use thiserror::Error;

use crate::command::{Command, CommandError, MAX_RECORD_BYTES};

/// Recipient field of a fire-and-forget record.
pub const ANONYMOUS_SENTINEL: &str = "-";

/// Identifier of a waiting client, taken from its process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(NonZeroU32);

impl ClientId {
    /// Wraps a positive identifier; zero is rejected.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(inner) => Some(Self(inner)),
            None => None,
        }
    }

    /// Identifier of the calling process.
    #[must_use]
    pub fn current_process() -> Self {
        Self::new(std::process::id()).unwrap_or(Self(NonZeroU32::MIN))
    }

    /// Numeric value of the identifier.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = RecordError;

    fn from_str(field: &str) -> Result<Self, Self::Err> {
        let invalid = || RecordError::InvalidRecipient {
            field: field.escape_debug().to_string(),
        };
        if field.is_empty() || !field.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid());
        }
        field
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(invalid)
    }
}

/// Who, if anyone, waits for the response to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// A client blocked on its response channel.
    Waiting(ClientId),
    /// Nobody; the server executes the command and answers no one.
    Anonymous,
}

impl Recipient {
    /// The waiting client, if there is one.
    #[must_use]
    pub const fn client(self) -> Option<ClientId> {
        match self {
            Self::Waiting(client) => Some(client),
            Self::Anonymous => None,
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting(client) => fmt::Display::fmt(client, formatter),
            Self::Anonymous => formatter.write_str(ANONYMOUS_SENTINEL),
        }
    }
}

impl FromStr for Recipient {
    type Err = RecordError;

    fn from_str(field: &str) -> Result<Self, Self::Err> {
        if field == ANONYMOUS_SENTINEL {
            Ok(Self::Anonymous)
        } else {
            field.parse().map(Self::Waiting)
        }
    }
}

/// One request: a recipient and the command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    recipient: Recipient,
    command: Command,
}

impl Record {
    /// Builds a record for `recipient`.
    #[must_use]
    pub const fn new(recipient: Recipient, command: Command) -> Self {
        Self { recipient, command }
    }

    /// Builds a fire-and-forget record.
    #[must_use]
    pub const fn anonymous(command: Command) -> Self {
        Self::new(Recipient::Anonymous, command)
    }

    /// Who waits for the response.
    #[must_use]
    pub const fn recipient(&self) -> Recipient {
        self.recipient
    }

    /// The command to execute.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// Splits the record into its recipient and command.
    #[must_use]
    pub fn into_parts(self) -> (Recipient, Command) {
        (self.recipient, self.command)
    }

    /// Encodes the record as one newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::TooLong`] when the line would not fit in one
    /// atomic pipe write.
    pub fn encode(&self) -> Result<EncodedRecord, RecordError> {
        let mut line = self.recipient.to_string();
        for token in self.command.tokens() {
            line.push(' ');
            line.push_str(token);
        }
        line.push('\n');

        if line.len() > MAX_RECORD_BYTES {
            return Err(RecordError::TooLong {
                length: line.len(),
                limit: MAX_RECORD_BYTES,
            });
        }
        Ok(EncodedRecord {
            recipient: self.recipient,
            bytes: line.into_bytes(),
        })
    }

    /// Decodes one line read from the request channel, re-validating every
    /// token.
    ///
    /// The trailing newline is optional so callers may pass either the raw
    /// line or its body.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] for lines that are too long, not UTF-8, carry an
    /// invalid recipient field or an invalid command.
    pub fn decode(line: &[u8]) -> Result<Self, RecordError> {
        let body = line.strip_suffix(b"\n").unwrap_or(line);
        if body.len() >= MAX_RECORD_BYTES {
            return Err(RecordError::TooLong {
                length: body.len().saturating_add(1),
                limit: MAX_RECORD_BYTES,
            });
        }
        let text = std::str::from_utf8(body).map_err(|_| RecordError::NotUtf8)?;
        let mut fields = text.split(' ');
        let recipient = fields.next().unwrap_or_default().parse::<Recipient>()?;
        let command = Command::new(fields)?;
        Ok(Self { recipient, command })
    }
}

/// Encodes a record for `recipient` straight from raw tokens.
///
/// # Errors
///
/// Returns [`RecordError`] when the tokens are invalid or the record is too
/// long.
pub fn encode<I, S>(recipient: Recipient, tokens: I) -> Result<EncodedRecord, RecordError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Record::new(recipient, Command::new(tokens)?).encode()
}

/// Recovers the waiting client from a line that failed to decode.
///
/// Used by the server to send a best-effort error response; returns `None`
/// when the recipient field itself is unusable or anonymous.
#[must_use]
pub fn recover_client(line: &[u8]) -> Option<ClientId> {
    let field = line
        .split(|byte| *byte == b' ' || *byte == b'\n')
        .next()?;
    std::str::from_utf8(field).ok()?.parse().ok()
}

/// A record already encoded and checked against the atomic write limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    recipient: Recipient,
    bytes: Vec<u8>,
}

impl EncodedRecord {
    /// Who waits for the response.
    #[must_use]
    pub const fn recipient(&self) -> Recipient {
        self.recipient
    }

    /// The encoded line, trailing newline included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the encoded line in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; encoded records carry at least a recipient and a newline.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reasons a record cannot be encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The command tokens are invalid.
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),
    /// The encoded record would exceed one atomic pipe write.
    #[error("record of {length} bytes exceeds the {limit} byte limit")]
    TooLong {
        /// Encoded length including the newline.
        length: usize,
        /// Largest permitted length.
        limit: usize,
    },
    /// The line was not valid UTF-8.
    #[error("record is not valid UTF-8")]
    NotUtf8,
    /// The recipient field was neither a positive integer nor `-`.
    #[error("invalid recipient field \"{field}\"")]
    InvalidRecipient {
        /// The offending field, escaped for display.
        field: String,
    },
}
