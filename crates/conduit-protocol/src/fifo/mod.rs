//! Non-blocking FIFO primitives shared by both channel kinds.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tracing::debug;

pub(crate) const FIFO_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::fifo");

/// Outcome of reading a fixed number of bytes before a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Filled {
    Complete,
    Eof(usize),
    TimedOut(usize),
}

fn fifo_mode() -> Mode {
    Mode::S_IRUSR | Mode::S_IWUSR
}

/// Creates an owner-only FIFO at `path`, replacing a stale FIFO left behind
/// by an earlier process with the same id.
pub(crate) fn create(path: &Path) -> io::Result<()> {
    match mkfifo(path, fifo_mode()) {
        Err(Errno::EEXIST) if is_fifo(path) => replace_stale(path),
        other => other.map_err(io::Error::from),
    }
}

fn replace_stale(path: &Path) -> io::Result<()> {
    debug!(
        target: FIFO_TARGET,
        path = %path.display(),
        "replacing stale FIFO"
    );
    fs::remove_file(path)?;
    mkfifo(path, fifo_mode()).map_err(io::Error::from)
}

pub(crate) fn is_fifo(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|metadata| metadata.file_type().is_fifo())
}

pub(crate) fn open_reader(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// Opens the write end without blocking; fails with `ENXIO` when nobody has
/// the FIFO open for reading.
pub(crate) fn open_writer(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// Whether an open failure means the other end is missing.
pub(crate) fn is_peer_absent(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::NotFound || error.raw_os_error() == Some(libc::ENXIO)
}

pub(crate) fn remove_quietly(path: &Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        debug!(
            target: FIFO_TARGET,
            path = %path.display(),
            %error,
            "failed to remove FIFO"
        );
    }
}

/// Blocks until `file` reports any of `events` or `timeout` elapses.
///
/// Returns `false` on timeout. Hang-ups count as readiness so callers observe
/// end-of-data through their next read.
pub(crate) fn wait_for(file: &File, events: libc::c_short, timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let millis = libc::c_int::try_from(remaining.as_millis()).unwrap_or(libc::c_int::MAX);
        let mut descriptor = libc::pollfd {
            fd: file.as_raw_fd(),
            events,
            revents: 0,
        };
        // SAFETY: `descriptor` is a single valid pollfd that outlives the call.
        let ready = unsafe { libc::poll(&mut descriptor, 1, millis) };
        if ready > 0 {
            return Ok(true);
        }
        if ready == 0 {
            return Ok(false);
        }
        let error = io::Error::last_os_error();
        if error.kind() != io::ErrorKind::Interrupted {
            return Err(error);
        }
    }
}

/// Fills `buffer` from a non-blocking `file`, waiting until `deadline` for
/// data to arrive.
pub(crate) fn read_exact_until(
    file: &mut File,
    buffer: &mut [u8],
    deadline: Instant,
) -> io::Result<Filled> {
    let mut filled = 0;
    loop {
        let Some(rest) = buffer.get_mut(filled..) else {
            return Ok(Filled::Complete);
        };
        if rest.is_empty() {
            return Ok(Filled::Complete);
        }
        match file.read(rest) {
            Ok(0) => return Ok(Filled::Eof(filled)),
            Ok(count) => filled += count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() || !wait_for(file, libc::POLLIN, remaining)? {
                    return Ok(Filled::TimedOut(filled));
                }
            }
            Err(error) => return Err(error),
        }
    }
}

/// Writes all of `bytes` to a non-blocking `file`, waiting until `deadline`
/// whenever the pipe is full. Returns `false` if the deadline passes first.
pub(crate) fn write_all_until(file: &mut File, bytes: &[u8], deadline: Instant) -> io::Result<bool> {
    let mut written = 0;
    loop {
        let Some(rest) = bytes.get(written..) else {
            return Ok(true);
        };
        if rest.is_empty() {
            return Ok(true);
        }
        match file.write(rest) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
            Ok(count) => written += count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() || !wait_for(file, libc::POLLOUT, remaining)? {
                    return Ok(false);
                }
            }
            Err(error) => return Err(error),
        }
    }
}
