//! The shared request channel.
//!
//! The server owns one FIFO per instance and publishes it under a stable
//! alias. Clients append whole records with a single write; the server reads
//! them back one line at a time.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::os::unix::fs::{FileTypeExt, symlink};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::command::MAX_RECORD_BYTES;
use crate::error::ChannelError;
use crate::fifo::{self, FIFO_TARGET};
use crate::record::EncodedRecord;

/// How long one idle wait lasts before the shutdown flag is checked again.
const IDLE_POLL: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 4096;

/// Server end of the request channel.
///
/// Holds a placeholder writer of its own so reads report "no data yet"
/// rather than end-of-file while no client is connected. Dropping the channel
/// removes the instance FIFO and, if it still points here, the alias.
#[derive(Debug)]
pub struct RequestChannel {
    path: PathBuf,
    alias: PathBuf,
    reader: File,
    _placeholder: File,
    buffer: Vec<u8>,
    discarding: bool,
}

impl RequestChannel {
    /// Creates the instance FIFO at `path`, opens both ends and points
    /// `alias` at it.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the FIFO cannot be created or opened or
    /// the alias cannot be replaced.
    pub fn create(path: &Path, alias: &Path) -> Result<Self, ChannelError> {
        fifo::create(path).map_err(|source| ChannelError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        let opened = open_both_ends(path).and_then(|(reader, placeholder)| {
            publish_alias(path, alias)?;
            Ok((reader, placeholder))
        });
        let (reader, placeholder) = match opened {
            Ok(ends) => ends,
            Err(error) => {
                fifo::remove_quietly(path);
                return Err(error);
            }
        };

        debug!(
            target: FIFO_TARGET,
            path = %path.display(),
            alias = %alias.display(),
            "request channel ready"
        );
        Ok(Self {
            path: path.to_path_buf(),
            alias: alias.to_path_buf(),
            reader,
            _placeholder: placeholder,
            buffer: Vec::with_capacity(READ_CHUNK),
            discarding: false,
        })
    }

    /// Path of the instance FIFO.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the stable alias.
    #[must_use]
    pub fn alias(&self) -> &Path {
        &self.alias
    }

    /// Returns the next complete record line, newline included.
    ///
    /// Waits in short polls until a line arrives; returns `Ok(None)` once
    /// `shutdown` is set and no complete line is buffered. Lines longer than
    /// [`MAX_RECORD_BYTES`] are discarded up to their newline.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Read`] when the FIFO cannot be read.
    pub fn consume_one(&mut self, shutdown: &AtomicBool) -> Result<Option<Vec<u8>>, ChannelError> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if shutdown.load(Ordering::SeqCst) {
                return Ok(None);
            }
            self.fill().map_err(|source| ChannelError::Read {
                path: self.path.clone(),
                source,
            })?;
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let newline = self.buffer.iter().position(|byte| *byte == b'\n')?;
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.len() > MAX_RECORD_BYTES {
                warn!(
                    target: FIFO_TARGET,
                    length = line.len(),
                    limit = MAX_RECORD_BYTES,
                    "discarding over-long record"
                );
                continue;
            }
            return Some(line);
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0_u8; READ_CHUNK];
        match self.reader.read(&mut chunk) {
            // The placeholder keeps a writer attached, so EOF only appears if
            // the FIFO was replaced underneath us; avoid spinning on it.
            Ok(0) => std::thread::sleep(IDLE_POLL),
            Ok(count) => {
                self.buffer
                    .extend_from_slice(chunk.get(..count).unwrap_or_default());
                self.enforce_limit();
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                fifo::wait_for(&self.reader, libc::POLLIN, IDLE_POLL)?;
            }
            Err(error) => return Err(error),
        }
        Ok(())
    }

    fn enforce_limit(&mut self) {
        if self.buffer.len() <= MAX_RECORD_BYTES || self.buffer.contains(&b'\n') {
            return;
        }
        if !self.discarding {
            warn!(
                target: FIFO_TARGET,
                buffered = self.buffer.len(),
                limit = MAX_RECORD_BYTES,
                "discarding over-long record"
            );
        }
        self.buffer.clear();
        self.discarding = true;
    }
}

impl Drop for RequestChannel {
    fn drop(&mut self) {
        if fs::read_link(&self.alias).is_ok_and(|target| target == self.path) {
            fifo::remove_quietly(&self.alias);
        }
        fifo::remove_quietly(&self.path);
        debug!(
            target: FIFO_TARGET,
            path = %self.path.display(),
            "request channel removed"
        );
    }
}

fn open_both_ends(path: &Path) -> Result<(File, File), ChannelError> {
    let open_error = |source: io::Error| ChannelError::Open {
        path: path.to_path_buf(),
        source,
    };
    let reader = fifo::open_reader(path).map_err(open_error)?;
    let placeholder = fifo::open_writer(path).map_err(open_error)?;
    Ok((reader, placeholder))
}

/// Points `alias` at `target` by renaming a freshly made symlink over it, so
/// clients never observe a missing alias during a restart.
fn publish_alias(target: &Path, alias: &Path) -> Result<(), ChannelError> {
    let mut staging_name = OsString::from(alias.as_os_str());
    staging_name.push(format!(".{}.new", std::process::id()));
    let staging = PathBuf::from(staging_name);

    fifo::remove_quietly(&staging);
    symlink(target, &staging)
        .and_then(|()| fs::rename(&staging, alias))
        .map_err(|source| {
            fifo::remove_quietly(&staging);
            ChannelError::Alias {
                path: alias.to_path_buf(),
                source,
            }
        })
}

/// Client end of the request channel.
#[derive(Debug)]
pub struct RequestPublisher {
    path: PathBuf,
    writer: File,
}

impl RequestPublisher {
    /// Opens the request channel at `path` for appending.
    ///
    /// Never blocks: a missing channel or one without a reader fails at once.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ServerNotRunning`] when no server is reading,
    /// [`ChannelError::NotAFifo`] when the path is something else, and
    /// [`ChannelError::Open`] for other failures.
    pub fn connect(path: &Path) -> Result<Self, ChannelError> {
        let writer = fifo::open_writer(path).map_err(|source| {
            if fifo::is_peer_absent(&source) {
                ChannelError::ServerNotRunning {
                    path: path.to_path_buf(),
                }
            } else {
                ChannelError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let is_fifo = writer
            .metadata()
            .is_ok_and(|metadata| metadata.file_type().is_fifo());
        if !is_fifo {
            return Err(ChannelError::NotAFifo {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Path the publisher writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record with a single write.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ChannelFull`] when the pipe has no room,
    /// [`ChannelError::ServerNotRunning`] when the reader went away and
    /// [`ChannelError::ShortWrite`] if the kernel split the record.
    pub fn publish(&mut self, record: &EncodedRecord) -> Result<(), ChannelError> {
        let bytes = record.as_bytes();
        loop {
            match self.writer.write(bytes) {
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                outcome => return self.classify_write(outcome, bytes.len()),
            }
        }
    }

    fn classify_write(&self, outcome: io::Result<usize>, expected: usize) -> Result<(), ChannelError> {
        let path = self.path.clone();
        match outcome {
            Ok(written) if written == expected => Ok(()),
            Ok(written) => Err(ChannelError::ShortWrite {
                path,
                written,
                expected,
            }),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                Err(ChannelError::ChannelFull { path })
            }
            Err(error) if error.kind() == io::ErrorKind::BrokenPipe => {
                Err(ChannelError::ServerNotRunning { path })
            }
            Err(source) => Err(ChannelError::Write { path, source }),
        }
    }
}
