//! Serves one record read from the request channel.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use conduit_config::ChannelPaths;
use conduit_protocol::record::recover_client;
use conduit_protocol::{ClientId, Command, Recipient, Record, RecordError, Response, ResponseSink};

use super::DISPATCH_TARGET;
use super::executor::CommandExecutor;
use crate::health::HealthReporter;

/// Decodes, executes and answers individual records.
///
/// Shared between the request loop and its concurrent workers; it holds only
/// immutable state and the shared executor.
pub(crate) struct RequestHandler {
    executor: Arc<dyn CommandExecutor>,
    paths: ChannelPaths,
    write_timeout: Duration,
    reporter: Arc<dyn HealthReporter>,
}

impl RequestHandler {
    pub(crate) fn new(
        executor: Arc<dyn CommandExecutor>,
        paths: ChannelPaths,
        write_timeout: Duration,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            executor,
            paths,
            write_timeout,
            reporter,
        }
    }

    /// Serves one raw line, newline included or not.
    pub(crate) fn handle_line(&self, line: &[u8]) {
        match Record::decode(line) {
            Ok(record) => self.handle(record),
            Err(error) => self.reject(line, &error),
        }
    }

    fn handle(&self, record: Record) {
        let (recipient, command) = record.into_parts();
        self.reporter.request_received(recipient, &command);
        match recipient {
            Recipient::Anonymous => {
                let response = self.execute(&command);
                self.reporter
                    .request_completed(recipient, &command, response.status());
            }
            Recipient::Waiting(client) => self.respond(client, &command),
        }
    }

    fn respond(&self, client: ClientId, command: &Command) {
        // The client learns of an abandoned response through its own
        // timeouts; the command still runs.
        let sink = self.open_and_acknowledge(client);
        let response = self.execute(command);
        self.reporter
            .request_completed(Recipient::Waiting(client), command, response.status());
        if let Some(sink) = sink
            && let Err(error) = sink.complete(&response)
        {
            self.reporter.response_abandoned(client, &error);
        }
    }

    fn open_and_acknowledge(&self, client: ClientId) -> Option<ResponseSink> {
        let path = self.paths.response_channel(client.get());
        let outcome = ResponseSink::open(&path, self.write_timeout).and_then(|mut sink| {
            self.reporter.response_opened(client);
            sink.acknowledge().map(|()| sink)
        });
        outcome
            .inspect_err(|error| self.reporter.response_abandoned(client, error))
            .ok()
    }

    fn execute(&self, command: &Command) -> Response {
        panic::catch_unwind(AssertUnwindSafe(|| self.executor.execute(command))).unwrap_or_else(
            |payload| {
                let message = panic_message(payload.as_ref());
                warn!(
                    target: DISPATCH_TARGET,
                    command = command.name(),
                    panic = message,
                    "executor panicked"
                );
                Response::error([format!(
                    "command '{}' failed: executor panicked: {message}",
                    command.name()
                )])
            },
        )
    }

    fn reject(&self, line: &[u8], error: &RecordError) {
        self.reporter.record_rejected(error);
        let Some(client) = recover_client(line) else {
            return;
        };
        let Some(sink) = self.open_and_acknowledge(client) else {
            return;
        };
        let response = Response::error([format!("invalid request: {error}")]);
        match sink.complete(&response) {
            Ok(()) => debug!(
                target: DISPATCH_TARGET,
                client = client.get(),
                "sent rejection for malformed record"
            ),
            Err(write_error) => self.reporter.response_abandoned(client, &write_error),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("opaque panic payload")
}
