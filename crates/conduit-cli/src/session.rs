//! Client side of one exchange with the server.
//!
//! A session either publishes a fire-and-forget record or walks a blocking
//! request through ack, status and payload, with each wait bounded by the
//! configured timeouts.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use conduit_config::{ChannelPaths, ChannelPathsError, Config};
use conduit_protocol::{
    BlockingRequest, ChannelError, ClientId, Command, DrainEnd, ExchangeError, Recipient, Record,
    RecordError, RequestPublisher, ResponseChannel, Status,
};

use crate::exit::ExitReason;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Deadlines applied to one blocking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timeouts {
    pub(crate) ack: Duration,
    pub(crate) status: Duration,
    pub(crate) drain: Duration,
}

impl Timeouts {
    pub(crate) const fn from_config(config: &Config) -> Self {
        Self {
            ack: config.ack_timeout(),
            status: config.status_timeout(),
            drain: config.drain_timeout(),
        }
    }
}

/// Failures that end a session; each maps onto one exit code.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RecordError),
    #[error("cannot reach conduitd: {0}")]
    ChannelNotWritable(#[source] ChannelError),
    #[error("failed to prepare channel directory: {0}")]
    ChannelDirectory(#[from] ChannelPathsError),
    #[error("failed to set up response channel: {0}")]
    ResponseChannel(#[source] ChannelError),
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl SessionError {
    pub(crate) const fn exit_reason(&self) -> ExitReason {
        match self {
            Self::InvalidRequest(_) => ExitReason::Validation,
            Self::ChannelNotWritable(_) => ExitReason::ChannelNotWritable,
            Self::ChannelDirectory(_)
            | Self::ResponseChannel(_)
            | Self::Exchange(ExchangeError::Channel(_) | ExchangeError::Forward(_)) => {
                ExitReason::LocalIo
            }
            Self::Exchange(ExchangeError::AckTimeout { .. }) => ExitReason::AckTimeout,
            Self::Exchange(ExchangeError::MalformedAck { .. }) => ExitReason::MalformedAck,
            Self::Exchange(ExchangeError::StatusTimeout { .. }) => ExitReason::StatusTimeout,
            Self::Exchange(ExchangeError::MalformedStatus { .. }) => ExitReason::MalformedStatus,
        }
    }
}

/// Channel locations and deadlines shared by every request of one process.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    paths: ChannelPaths,
    timeouts: Timeouts,
}

impl Session {
    pub(crate) const fn new(paths: ChannelPaths, timeouts: Timeouts) -> Self {
        Self { paths, timeouts }
    }

    /// Derives the channel paths from `config`, creating the directory if needed.
    pub(crate) fn from_config(config: &Config) -> Result<Self, SessionError> {
        let paths = ChannelPaths::from_config(config)?;
        Ok(Self::new(paths, Timeouts::from_config(config)))
    }

    /// Publishes `command` without a response channel.
    pub(crate) fn notify(&self, command: Command) -> Result<(), SessionError> {
        let name = command.name().to_owned();
        let record = Record::new(Recipient::Anonymous, command).encode()?;
        self.connect()?
            .publish(&record)
            .map_err(SessionError::ChannelNotWritable)?;
        debug!(
            target: SESSION_TARGET,
            command = %name,
            "published fire-and-forget request"
        );
        Ok(())
    }

    /// Sends `command` as `client` and forwards each payload line.
    ///
    /// `forward` sees the status with every line so it can route success and
    /// failure output differently.
    pub(crate) fn request<F>(
        &self,
        client: ClientId,
        command: Command,
        mut forward: F,
    ) -> Result<Status, SessionError>
    where
        F: FnMut(Status, &str) -> io::Result<()>,
    {
        let name = command.name().to_owned();
        let mut channel = ResponseChannel::create(client, self.paths.response_channel(client.get()))
            .map_err(SessionError::ResponseChannel)?;
        let request = BlockingRequest::new(&mut channel, command)?;
        let mut publisher = self.connect()?;
        let awaiting_ack = request
            .publish(&mut publisher)
            .map_err(SessionError::ChannelNotWritable)?;
        debug!(
            target: SESSION_TARGET,
            client = client.get(),
            command = %name,
            "published request"
        );

        let (status, payload) = awaiting_ack
            .await_ack(self.timeouts.ack)?
            .await_status(self.timeouts.status)?;
        let end = payload.drain(self.timeouts.drain, |line| forward(status, line))?;
        if end == DrainEnd::Stalled {
            warn!(
                target: SESSION_TARGET,
                command = %name,
                drain_timeout_ms = u64::try_from(self.timeouts.drain.as_millis()).unwrap_or(u64::MAX),
                "payload stalled before the server closed the channel"
            );
        }
        Ok(status)
    }

    fn connect(&self) -> Result<RequestPublisher, SessionError> {
        RequestPublisher::connect(self.paths.request_alias()).map_err(SessionError::ChannelNotWritable)
    }
}
