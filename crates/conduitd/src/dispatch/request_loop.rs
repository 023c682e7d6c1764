//! Background thread that drains the request channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use conduit_config::DispatchMode;
use conduit_protocol::RequestChannel;

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::handler::RequestHandler;

const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Reads records one at a time and serves them in the configured mode.
pub(crate) struct RequestLoop {
    channel: RequestChannel,
    handler: Arc<RequestHandler>,
    mode: DispatchMode,
}

impl RequestLoop {
    pub(crate) fn new(channel: RequestChannel, handler: Arc<RequestHandler>, mode: DispatchMode) -> Self {
        Self {
            channel,
            handler,
            mode,
        }
    }

    /// Moves the loop onto its own thread; it runs until `stop` is raised.
    pub(crate) fn start(self, stop: Arc<AtomicBool>) -> Result<DispatchHandle, DispatchError> {
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("conduitd-requests".to_owned())
            .spawn(move || self.run(&flag))
            .map_err(|source| DispatchError::Spawn { source })?;
        Ok(DispatchHandle {
            stop,
            handle: Some(handle),
        })
    }

    fn run(mut self, stop: &AtomicBool) {
        info!(
            target: DISPATCH_TARGET,
            channel = %self.channel.path().display(),
            alias = %self.channel.alias().display(),
            mode = %self.mode,
            "request loop active"
        );
        let mut workers = Vec::new();
        let mut failing = false;
        loop {
            match self.channel.consume_one(stop) {
                Ok(Some(line)) => {
                    failing = false;
                    self.dispatch(line, &mut workers);
                }
                Ok(None) => break,
                Err(error) => {
                    if !failing {
                        warn!(
                            target: DISPATCH_TARGET,
                            error = %error,
                            "request channel read failed"
                        );
                    }
                    failing = true;
                    thread::sleep(ERROR_BACKOFF);
                }
            }
            workers.retain(|worker: &JoinHandle<()>| !worker.is_finished());
        }

        if !workers.is_empty() {
            info!(
                target: DISPATCH_TARGET,
                in_flight = workers.len(),
                "waiting for in-flight requests"
            );
        }
        for worker in workers {
            if worker.join().is_err() {
                warn!(target: DISPATCH_TARGET, "request worker panicked");
            }
        }
        info!(target: DISPATCH_TARGET, "request loop stopped");
        // Dropping the channel removes the alias and the instance FIFO.
    }

    fn dispatch(&self, line: Vec<u8>, workers: &mut Vec<JoinHandle<()>>) {
        match self.mode {
            DispatchMode::Serial => self.handler.handle_line(&line),
            DispatchMode::Concurrent => {
                let handler = Arc::clone(&self.handler);
                let record = line.clone();
                match thread::Builder::new()
                    .name("conduitd-worker".to_owned())
                    .spawn(move || handler.handle_line(&record))
                {
                    Ok(worker) => workers.push(worker),
                    Err(error) => {
                        warn!(
                            target: DISPATCH_TARGET,
                            error = %error,
                            "failed to spawn request worker; serving inline"
                        );
                        self.handler.handle_line(&line);
                    }
                }
            }
        }
    }
}

/// Handle to the background request loop.
pub(crate) struct DispatchHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchHandle {
    pub(crate) fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Waits for the loop, and any in-flight workers, to finish.
    pub(crate) fn join(mut self) -> Result<(), DispatchError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| DispatchError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for DispatchHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
