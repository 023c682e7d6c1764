//! Stable process exit codes for the client.

use std::fmt::Write as _;
use std::process::ExitCode;

/// Why the client exited; each reason maps to one stable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The server reported success.
    Success,
    /// The server reported an error.
    RemoteError,
    /// The command or arguments were rejected locally.
    Validation,
    /// No server was reading the request channel.
    ChannelNotWritable,
    /// The server did not acknowledge in time.
    AckTimeout,
    /// The acknowledgement bytes were wrong.
    MalformedAck,
    /// The server did not report a status in time.
    StatusTimeout,
    /// The status bytes were wrong.
    MalformedStatus,
    /// Setting up or reading the response channel failed locally.
    LocalIo,
    /// Configuration could not be loaded.
    Configuration,
}

impl ExitReason {
    /// Every reason, in code order.
    pub const ALL: [Self; 10] = [
        Self::Success,
        Self::RemoteError,
        Self::Validation,
        Self::ChannelNotWritable,
        Self::AckTimeout,
        Self::MalformedAck,
        Self::StatusTimeout,
        Self::MalformedStatus,
        Self::LocalIo,
        Self::Configuration,
    ];

    /// Numeric process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::RemoteError => 1,
            Self::Validation => 2,
            Self::ChannelNotWritable => 3,
            Self::AckTimeout => 4,
            Self::MalformedAck => 5,
            Self::StatusTimeout => 6,
            Self::MalformedStatus => 7,
            Self::LocalIo => 8,
            Self::Configuration => 9,
        }
    }

    /// One-line description used in `--help` and `--exit-codes`.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RemoteError => "the server reported an error",
            Self::Validation => "invalid command or arguments",
            Self::ChannelNotWritable => "no server is accepting requests",
            Self::AckTimeout => "the server did not acknowledge in time",
            Self::MalformedAck => "malformed acknowledgement",
            Self::StatusTimeout => "the server did not report a status in time",
            Self::MalformedStatus => "malformed status",
            Self::LocalIo => "local channel setup or IO failure",
            Self::Configuration => "configuration could not be loaded",
        }
    }
}

impl From<ExitReason> for ExitCode {
    fn from(reason: ExitReason) -> Self {
        Self::from(reason.code())
    }
}

/// Renders the exit code table, one code per line.
#[must_use]
pub fn exit_code_table() -> String {
    ExitReason::ALL
        .iter()
        .fold(String::from("Exit codes:\n"), |mut table, reason| {
            let _ = writeln!(table, "  {:>2}  {}", reason.code(), reason.description());
            table
        })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn codes_follow_declaration_order() {
        for (expected, reason) in (0_u8..).zip(ExitReason::ALL) {
            assert_eq!(reason.code(), expected, "{reason:?}");
        }
    }

    #[rstest]
    #[case(ExitReason::RemoteError, "   1  the server reported an error")]
    #[case(ExitReason::Configuration, "   9  configuration could not be loaded")]
    fn table_lists_each_code(#[case] reason: ExitReason, #[case] line: &str) {
        let table = exit_code_table();
        assert!(table.lines().any(|candidate| candidate == line), "{reason:?} missing:\n{table}");
    }
}
