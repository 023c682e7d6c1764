//! Error types for the client runtime.

use std::sync::Arc;

use conduit_protocol::CommandError;
use thiserror::Error;

use crate::exit::ExitReason;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AppError {
    pub(crate) const fn exit_reason(&self) -> ExitReason {
        match self {
            Self::LoadConfiguration(_) => ExitReason::Configuration,
            Self::CliUsage(_) | Self::InvalidCommand(_) => ExitReason::Validation,
            Self::Output(_) => ExitReason::LocalIo,
            Self::Session(error) => error.exit_reason(),
        }
    }
}
