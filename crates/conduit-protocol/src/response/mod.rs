//! Per-client response channels.
//!
//! A waiting client creates its own FIFO, keeps the read end open and holds a
//! placeholder writer until the acknowledgement arrives. The server opens the
//! write end once, sends the ack, then the status and payload, and closes.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ChannelError;
use crate::fifo::{self, FIFO_TARGET, Filled};
use crate::record::ClientId;
use crate::wire::{ACK_TOKEN, Response, TOKEN_LEN};

/// Client end of a response channel.
///
/// Exists only once the FIFO has been created and opened for reading, which
/// is what allows a blocking request to be built from it. The FIFO is removed
/// when the value is dropped, whatever the outcome of the exchange.
#[derive(Debug)]
pub struct ResponseChannel {
    client: ClientId,
    path: PathBuf,
    reader: File,
    placeholder: Option<File>,
}

impl ResponseChannel {
    /// Creates the FIFO at `path` for `client` and opens it without waiting
    /// on the server.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Create`] or [`ChannelError::Open`]; the FIFO is
    /// removed again on failure.
    pub fn create(client: ClientId, path: PathBuf) -> Result<Self, ChannelError> {
        fifo::create(&path).map_err(|source| ChannelError::Create {
            path: path.clone(),
            source,
        })?;
        let opened = fifo::open_reader(&path).and_then(|reader| {
            fifo::open_writer(&path).map(|placeholder| (reader, placeholder))
        });
        match opened {
            Ok((reader, placeholder)) => {
                debug!(
                    target: FIFO_TARGET,
                    client = client.get(),
                    path = %path.display(),
                    "response channel ready"
                );
                Ok(Self {
                    client,
                    path,
                    reader,
                    placeholder: Some(placeholder),
                })
            }
            Err(source) => {
                fifo::remove_quietly(&path);
                Err(ChannelError::Open { path, source })
            }
        }
    }

    /// Client that owns the channel.
    #[must_use]
    pub const fn client(&self) -> ClientId {
        self.client
    }

    /// Path of the FIFO.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drops the placeholder writer so the server closing its end reads as
    /// end-of-data.
    pub(crate) fn release_placeholder(&mut self) {
        self.placeholder = None;
    }

    pub(crate) fn read_token(&mut self, timeout: Duration) -> Result<TokenRead, ChannelError> {
        let mut token = [0_u8; TOKEN_LEN];
        let deadline = Instant::now() + timeout;
        let filled = fifo::read_exact_until(&mut self.reader, &mut token, deadline).map_err(
            |source| ChannelError::Read {
                path: self.path.clone(),
                source,
            },
        )?;
        let received = |count: usize| token.get(..count).unwrap_or_default().to_vec();
        Ok(match filled {
            Filled::Complete => TokenRead::Token(token),
            Filled::Eof(count) => TokenRead::Truncated(received(count)),
            Filled::TimedOut(count) => TokenRead::TimedOut(received(count)),
        })
    }

    pub(crate) const fn reader_mut(&mut self) -> &mut File {
        &mut self.reader
    }
}

impl Drop for ResponseChannel {
    fn drop(&mut self) {
        self.placeholder = None;
        fifo::remove_quietly(&self.path);
    }
}

/// Result of waiting for one handshake token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenRead {
    Token([u8; TOKEN_LEN]),
    Truncated(Vec<u8>),
    TimedOut(Vec<u8>),
}

/// Server end of a response channel, used for exactly one response.
#[derive(Debug)]
pub struct ResponseSink {
    path: PathBuf,
    writer: File,
    write_timeout: Duration,
}

impl ResponseSink {
    /// Opens the client's FIFO for writing without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NoReader`] when the client never created the
    /// FIFO or no longer has it open, and [`ChannelError::Open`] otherwise.
    pub fn open(path: &Path, write_timeout: Duration) -> Result<Self, ChannelError> {
        let writer = fifo::open_writer(path).map_err(|source| {
            if fifo::is_peer_absent(&source) {
                ChannelError::NoReader {
                    path: path.to_path_buf(),
                }
            } else {
                ChannelError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            write_timeout,
        })
    }

    /// Path of the client's FIFO.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Confirms receipt of the request.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the write fails or times out.
    pub fn acknowledge(&mut self) -> Result<(), ChannelError> {
        self.write(ACK_TOKEN)
    }

    /// Writes the status and payload as one buffer and closes the channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the write fails or times out.
    pub fn complete(mut self, response: &Response) -> Result<(), ChannelError> {
        self.write(&response.encode_body())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        let deadline = Instant::now() + self.write_timeout;
        match fifo::write_all_until(&mut self.writer, bytes, deadline) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ChannelError::WriteTimedOut {
                path: self.path.clone(),
                timeout_ms: u64::try_from(self.write_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Err(error) if error.kind() == std::io::ErrorKind::BrokenPipe => {
                Err(ChannelError::NoReader {
                    path: self.path.clone(),
                })
            }
            Err(source) => Err(ChannelError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
