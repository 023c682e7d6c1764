//! Enumerated configuration values parsed from flags, environment and files.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output format for the server's structured logs.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Single human-readable line per event.
    Compact,
}

/// How the server schedules requests read from the request channel.
///
/// The channel itself is always read by a single thread; the mode only
/// decides where execution and the response write happen.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DispatchMode {
    /// Each request, response write included, completes before the next read.
    #[default]
    Serial,
    /// Each decoded request executes and responds on its own thread.
    Concurrent,
}

/// Error raised when a flag or variable names an unknown enumerated value.
pub type ValueParseError = strum::ParseError;
