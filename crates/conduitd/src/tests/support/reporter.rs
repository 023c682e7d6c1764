//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use conduit_config::Config;
use conduit_protocol::{ChannelError, ClientId, Command, Recipient, RecordError, Status};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A record was decoded; carries the command as it would be re-encoded.
    RequestReceived { recipient: Recipient, command: String },
    /// A line was rejected with the given diagnostic.
    RecordRejected(String),
    /// The response channel of a waiting client was opened.
    ResponseOpened(ClientId),
    /// A response could not be delivered.
    ResponseAbandoned(ClientId),
    /// The executor produced a response.
    RequestCompleted { recipient: Recipient, status: Status },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn request_received(&self, recipient: Recipient, command: &Command) {
        self.record(HealthEvent::RequestReceived {
            recipient,
            command: command.to_string(),
        });
    }

    fn record_rejected(&self, error: &RecordError) {
        self.record(HealthEvent::RecordRejected(error.to_string()));
    }

    fn response_opened(&self, client: ClientId) {
        self.record(HealthEvent::ResponseOpened(client));
    }

    fn response_abandoned(&self, client: ClientId, _error: &ChannelError) {
        self.record(HealthEvent::ResponseAbandoned(client));
    }

    fn request_completed(&self, recipient: Recipient, _command: &Command, status: Status) {
        self.record(HealthEvent::RequestCompleted { recipient, status });
    }
}
