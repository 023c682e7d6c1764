//! Fake server for behavioural tests.
//!
//! Owns a real request channel so the client publishes exactly as it would
//! to `conduitd`, then answers each waiting record according to a script.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use conduit_config::ChannelPaths;
use conduit_protocol::{Recipient, Record, RequestChannel, Response, ResponseSink};

const WRITE_TIMEOUT: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How the fake server treats each waiting record.
#[derive(Debug, Clone)]
pub(in crate::tests) enum Script {
    /// Acknowledge, then send the response.
    Respond(Response),
    /// Read the record and never answer.
    Silent,
    /// Acknowledge and then hold the channel open without a status.
    AckOnly,
    /// Write these bytes in place of a response, then close.
    Raw(Vec<u8>),
}

/// A scripted server thread reading the request channel.
pub(in crate::tests) struct FakeServer {
    stop: Arc<AtomicBool>,
    records: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeServer {
    /// Publishes a request channel under `paths` and serves it until dropped.
    pub fn spawn(paths: &ChannelPaths, script: Script) -> Result<Self> {
        let mut channel = RequestChannel::create(
            &paths.instance_channel(std::process::id()),
            paths.request_alias(),
        )
        .context("create fake request channel")?;
        let stop = Arc::new(AtomicBool::new(false));
        let records = Arc::new(Mutex::new(Vec::new()));
        let (flag, seen, paths) = (Arc::clone(&stop), Arc::clone(&records), paths.clone());
        let handle = thread::spawn(move || {
            let mut held = Vec::new();
            while let Some(line) = channel.consume_one(&flag).context("read request channel")? {
                seen.lock()
                    .map_err(|error| anyhow!("lock records: {error}"))?
                    .push(String::from_utf8_lossy(&line).into_owned());
                if let Some(writer) = answer(&paths, &script, &line)? {
                    held.push(writer);
                }
            }
            drop(held);
            Ok(())
        });
        Ok(Self {
            stop,
            records,
            handle: Some(handle),
        })
    }

    /// Waits up to `timeout` for `count` records and returns what arrived.
    pub fn wait_for_records(&self, count: usize, timeout: Duration) -> Result<Vec<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let records = self
                .records
                .lock()
                .map_err(|error| anyhow!("lock records: {error}"))?
                .clone();
            if records.len() >= count || Instant::now() >= deadline {
                return Ok(records);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Stops the server thread and surfaces any failure it hit.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

fn answer(paths: &ChannelPaths, script: &Script, line: &[u8]) -> Result<Option<File>> {
    let record = Record::decode(line).context("decode record")?;
    let (recipient, _) = record.into_parts();
    let Recipient::Waiting(client) = recipient else {
        return Ok(None);
    };
    let path = paths.response_channel(client.get());
    match script {
        Script::Respond(response) => {
            let mut sink = ResponseSink::open(&path, WRITE_TIMEOUT).context("open response")?;
            sink.acknowledge().context("send ack")?;
            sink.complete(response).context("send response")?;
            Ok(None)
        }
        Script::Silent => Ok(None),
        Script::AckOnly => {
            let mut writer = open_writer(&path)?;
            writer.write_all(b"ACK").context("send ack")?;
            Ok(Some(writer))
        }
        Script::Raw(bytes) => {
            open_writer(&path)?
                .write_all(bytes)
                .context("send raw bytes")?;
            Ok(None)
        }
    }
}

fn open_writer(path: &std::path::Path) -> Result<File> {
    // The client holds the read end open, so this never blocks.
    OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))
}
