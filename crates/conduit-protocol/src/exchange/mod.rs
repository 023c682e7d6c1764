//! One blocking exchange, seen from the client.
//!
//! Each state is its own type and every transition consumes the previous
//! state, so the order publish, ack, status, payload is enforced by the
//! compiler:
//!
//! ```text
//! BlockingRequest --publish--> AwaitingAck --await_ack--> AwaitingStatus
//!     --await_status--> (Status, Payload) --drain--> DrainEnd
//! ```

use std::io::{self, Read};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::command::Command;
use crate::error::ChannelError;
use crate::fifo::{self, FIFO_TARGET};
use crate::record::{EncodedRecord, Recipient, Record, RecordError};
use crate::request::RequestPublisher;
use crate::response::{ResponseChannel, TokenRead};
use crate::wire::{ACK_TOKEN, Status};

const DRAIN_CHUNK: usize = 4096;

/// A validated request addressed to an open response channel.
#[derive(Debug)]
pub struct BlockingRequest<'c> {
    channel: &'c mut ResponseChannel,
    record: EncodedRecord,
}

impl<'c> BlockingRequest<'c> {
    /// Encodes `command` for the client owning `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::TooLong`] when the record would not fit in one
    /// atomic write.
    pub fn new(channel: &'c mut ResponseChannel, command: Command) -> Result<Self, RecordError> {
        let record = Record::new(Recipient::Waiting(channel.client()), command).encode()?;
        Ok(Self { channel, record })
    }

    /// The encoded record that will be published.
    #[must_use]
    pub const fn record(&self) -> &EncodedRecord {
        &self.record
    }

    /// Appends the record to the request channel.
    ///
    /// # Errors
    ///
    /// Returns the publisher's [`ChannelError`].
    pub fn publish(self, publisher: &mut RequestPublisher) -> Result<AwaitingAck<'c>, ChannelError> {
        publisher.publish(&self.record)?;
        Ok(AwaitingAck {
            channel: self.channel,
        })
    }
}

/// Request published; the server has not yet confirmed receipt.
#[derive(Debug)]
pub struct AwaitingAck<'c> {
    channel: &'c mut ResponseChannel,
}

impl<'c> AwaitingAck<'c> {
    /// Waits up to `timeout` for the ack token.
    ///
    /// On success the placeholder writer is dropped, so the server closing
    /// its end later reads as end-of-data.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::AckTimeout`] or [`ExchangeError::MalformedAck`].
    pub fn await_ack(self, timeout: Duration) -> Result<AwaitingStatus<'c>, ExchangeError> {
        match self.channel.read_token(timeout)? {
            TokenRead::Token(token) if &token == ACK_TOKEN => {
                self.channel.release_placeholder();
                Ok(AwaitingStatus {
                    channel: self.channel,
                })
            }
            TokenRead::Token(token) => Err(ExchangeError::MalformedAck {
                received: escape(&token),
            }),
            TokenRead::Truncated(partial) => Err(ExchangeError::MalformedAck {
                received: escape(&partial),
            }),
            TokenRead::TimedOut(_) => Err(ExchangeError::AckTimeout {
                timeout_ms: millis(timeout),
            }),
        }
    }
}

/// Receipt confirmed; the command is executing.
#[derive(Debug)]
pub struct AwaitingStatus<'c> {
    channel: &'c mut ResponseChannel,
}

impl<'c> AwaitingStatus<'c> {
    /// Waits up to `timeout` for the status token.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::StatusTimeout`] or
    /// [`ExchangeError::MalformedStatus`].
    pub fn await_status(self, timeout: Duration) -> Result<(Status, Payload<'c>), ExchangeError> {
        match self.channel.read_token(timeout)? {
            TokenRead::Token(token) => match Status::from_token(&token) {
                Some(status) => Ok((
                    status,
                    Payload {
                        channel: self.channel,
                        pending: Vec::new(),
                    },
                )),
                None => Err(ExchangeError::MalformedStatus {
                    received: escape(&token),
                }),
            },
            TokenRead::Truncated(partial) => Err(ExchangeError::MalformedStatus {
                received: escape(&partial),
            }),
            TokenRead::TimedOut(_) => Err(ExchangeError::StatusTimeout {
                timeout_ms: millis(timeout),
            }),
        }
    }
}

/// How the payload stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainEnd {
    /// The server closed its end.
    Closed,
    /// No data arrived within the stall timeout.
    Stalled,
}

/// Payload lines following the status token.
#[derive(Debug)]
pub struct Payload<'c> {
    channel: &'c mut ResponseChannel,
    pending: Vec<u8>,
}

impl Payload<'_> {
    /// Forwards every payload line to `forward` until end-of-data, or until
    /// nothing arrives for `stall`.
    ///
    /// Lines are passed without their newline. A trailing fragment with no
    /// newline is forwarded as a final line.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Channel`] when reading fails and
    /// [`ExchangeError::Forward`] when `forward` fails.
    pub fn drain<F>(mut self, stall: Duration, mut forward: F) -> Result<DrainEnd, ExchangeError>
    where
        F: FnMut(&str) -> io::Result<()>,
    {
        let mut chunk = [0_u8; DRAIN_CHUNK];
        loop {
            match self.channel.reader_mut().read(&mut chunk) {
                Ok(0) => {
                    self.flush_fragment(&mut forward)?;
                    return Ok(DrainEnd::Closed);
                }
                Ok(count) => {
                    self.pending
                        .extend_from_slice(chunk.get(..count).unwrap_or_default());
                    self.forward_complete_lines(&mut forward)?;
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    let ready = fifo::wait_for(self.channel.reader_mut(), libc::POLLIN, stall)
                        .map_err(|source| self.read_error(source))?;
                    if !ready {
                        debug!(
                            target: FIFO_TARGET,
                            stall_ms = millis(stall),
                            "payload stalled; treating as end of data"
                        );
                        self.flush_fragment(&mut forward)?;
                        return Ok(DrainEnd::Stalled);
                    }
                }
                Err(source) => return Err(self.read_error(source)),
            }
        }
    }

    fn forward_complete_lines<F>(&mut self, forward: &mut F) -> Result<(), ExchangeError>
    where
        F: FnMut(&str) -> io::Result<()>,
    {
        while let Some(newline) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let body = line.strip_suffix(b"\n").unwrap_or(&line);
            forward(&String::from_utf8_lossy(body)).map_err(ExchangeError::Forward)?;
        }
        Ok(())
    }

    fn flush_fragment<F>(&mut self, forward: &mut F) -> Result<(), ExchangeError>
    where
        F: FnMut(&str) -> io::Result<()>,
    {
        if self.pending.is_empty() {
            return Ok(());
        }
        let fragment = std::mem::take(&mut self.pending);
        forward(&String::from_utf8_lossy(&fragment)).map_err(ExchangeError::Forward)
    }

    fn read_error(&self, source: io::Error) -> ExchangeError {
        ExchangeError::Channel(ChannelError::Read {
            path: self.channel.path().to_path_buf(),
            source,
        })
    }
}

/// Failures after a blocking request has been published.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The server did not confirm receipt in time.
    #[error("server did not acknowledge the request within {timeout_ms} ms")]
    AckTimeout {
        /// Budget that elapsed.
        timeout_ms: u64,
    },
    /// Something other than the ack token arrived.
    #[error("expected acknowledgement, received \"{received}\"")]
    MalformedAck {
        /// Bytes received, escaped for display.
        received: String,
    },
    /// The server acknowledged but did not report a status in time.
    #[error("server did not report a status within {timeout_ms} ms")]
    StatusTimeout {
        /// Budget that elapsed.
        timeout_ms: u64,
    },
    /// Something other than a status token arrived.
    #[error("expected status, received \"{received}\"")]
    MalformedStatus {
        /// Bytes received, escaped for display.
        received: String,
    },
    /// The response channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
    /// Forwarding a payload line failed.
    #[error("failed to forward payload: {0}")]
    Forward(#[source] io::Error),
}

fn escape(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
