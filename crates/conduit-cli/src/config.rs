//! Configuration loading helpers for the conduit client.
//!
//! Configuration flags are split from the command line before `clap` sees
//! it, so `ortho_config` only receives the flags it understands and the
//! command tokens pass through untouched.

use std::ffi::{OsStr, OsString};

use conduit_config::Config;

use crate::errors::AppError;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `conduit_config::Config`.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--channel-dir",
    "--ack-timeout-ms",
    "--status-timeout-ms",
    "--drain-timeout-ms",
    "--response-write-timeout-ms",
    "--execution-timeout-ms",
    "--dispatch-mode",
    "--executor",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the client.
    ///
    /// Configuration flags must appear before the command; anything after
    /// the first other argument is treated as part of the command.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

/// Leading configuration flags and where the rest of the command line starts.
#[derive(Debug)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

impl ConfigArgumentSplit {
    /// Program name followed by every argument after the configuration flags.
    pub(crate) fn cli_arguments(&self, args: &[OsString]) -> Vec<OsString> {
        args.first()
            .into_iter()
            .chain(args.iter().skip(self.command_start))
            .cloned()
            .collect()
    }
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut config_arguments: Vec<OsString> = args.first().cloned().into_iter().collect();
    let mut command_start = config_arguments.len();
    let mut expecting_value = false;

    for argument in args.iter().skip(1) {
        if expecting_value {
            expecting_value = false;
        } else {
            match classify(argument) {
                FlagAction::Include { needs_value } => expecting_value = needs_value,
                FlagAction::Skip => break,
            }
        }
        config_arguments.push(argument.clone());
        command_start += 1;
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", false)]
    #[case("--log-filter", true)]
    #[case("--channel-dir", true)]
    fn known_flags_are_included(#[case] argument: &str, #[case] expected: bool) {
        match classify(OsStr::new(argument)) {
            FlagAction::Include { needs_value } => assert_eq!(needs_value, expected),
            FlagAction::Skip => panic!("expected {argument} to be a configuration flag"),
        }
    }

    #[rstest]
    #[case("ping")]
    #[case("--no-wait")]
    #[case("--unknown=1")]
    fn other_arguments_stop_the_split(#[case] argument: &str) {
        assert!(matches!(classify(OsStr::new(argument)), FlagAction::Skip));
    }

    #[rstest]
    fn splits_leading_configuration_flags() {
        let args = os(&[
            "conduit",
            "--channel-dir",
            "/run/conduit",
            "--ack-timeout-ms=50",
            "--no-wait",
            "build",
            "--log-filter",
            "debug",
        ]);
        let split = split_config_arguments(&args);

        assert_eq!(
            split.config_arguments,
            os(&["conduit", "--channel-dir", "/run/conduit", "--ack-timeout-ms=50"])
        );
        assert_eq!(
            split.cli_arguments(&args),
            os(&["conduit", "--no-wait", "build", "--log-filter", "debug"])
        );
    }

    #[rstest]
    fn empty_arguments_split_cleanly() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(split.cli_arguments(&[]).is_empty());
    }
}
