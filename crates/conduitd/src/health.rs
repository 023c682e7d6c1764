//! Structured health reporting for server lifecycle and request events.

use std::sync::Arc;

use conduit_config::Config;
use conduit_protocol::{ChannelError, ClientId, Command, Recipient, RecordError, Status};

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle and per-request events.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once a record has been decoded.
    fn request_received(&self, recipient: Recipient, command: &Command);

    /// Invoked when a line from the request channel could not be decoded.
    fn record_rejected(&self, error: &RecordError);

    /// Invoked when the server opened a waiting client's response channel.
    fn response_opened(&self, client: ClientId);

    /// Invoked when a response could not be delivered.
    fn response_abandoned(&self, client: ClientId, error: &ChannelError);

    /// Invoked once the executor has produced a response.
    fn request_completed(&self, recipient: Recipient, command: &Command, status: Status);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn request_received(&self, recipient: Recipient, command: &Command) {
        (**self).request_received(recipient, command);
    }

    fn record_rejected(&self, error: &RecordError) {
        (**self).record_rejected(error);
    }

    fn response_opened(&self, client: ClientId) {
        (**self).response_opened(client);
    }

    fn response_abandoned(&self, client: ClientId, error: &ChannelError) {
        (**self).response_abandoned(client, error);
    }

    fn request_completed(&self, recipient: Recipient, command: &Command, status: Status) {
        (**self).request_completed(recipient, command, status);
    }
}

/// Default reporter that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            channel_dir = %config.channel_dir(),
            dispatch_mode = %config.dispatch_mode(),
            executor = ?config.executor(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn request_received(&self, recipient: Recipient, command: &Command) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "request_received",
            recipient = %recipient,
            command = command.name(),
            arguments = command.arguments().len(),
            "request received"
        );
    }

    fn record_rejected(&self, error: &RecordError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "record_rejected",
            error = %error,
            "discarded malformed record"
        );
    }

    fn response_opened(&self, client: ClientId) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "response_opened",
            client = client.get(),
            "response channel opened"
        );
    }

    fn response_abandoned(&self, client: ClientId, error: &ChannelError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "response_abandoned",
            client = client.get(),
            error = %error,
            "response abandoned"
        );
    }

    fn request_completed(&self, recipient: Recipient, command: &Command, status: Status) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "request_completed",
            recipient = %recipient,
            command = command.name(),
            status = %status,
            "request completed"
        );
    }
}
