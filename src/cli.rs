use crate::follower::FollowBackend;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::ffi::OsString;
use std::path::PathBuf;

pub const DEFAULT_AUTH_LOG: &str = "/var/log/auth.log";

/// Single-dash long flags accepted for compatibility with `-history` style
/// invocations.
const LEGACY_FLAGS: &[&str] = &["history", "last", "watch"];

#[derive(Parser, Debug)]
#[command(
    name = "sshlogtool",
    about = "SSH login monitor for auth.log: login history, sudo activity and live watch",
    version,
    args_override_self = true,
    long_about = "sshlogtool parses an authentication log for accepted SSH logins, attaches the sudo commands each user ran after logging in, and can follow the log live to report new logins as they happen."
)]
pub struct Args {
    /// Print every detected login with its actions
    #[arg(long = "history")]
    pub history: bool,

    /// Print only the most recent login
    #[arg(long = "last")]
    pub last: bool,

    /// Follow the log and report new logins as they appear
    #[arg(long = "watch")]
    pub watch: bool,

    /// Authentication log to read
    #[arg(
        short = 'f',
        long = "file",
        env = "SSHLOGTOOL_FILE",
        default_value = DEFAULT_AUTH_LOG
    )]
    pub file: PathBuf,

    /// Emit JSON instead of text (history and last)
    #[arg(long = "json")]
    pub json: bool,

    /// Disable ANSI colors
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// How to follow the log in watch mode
    #[arg(long = "follow", value_enum, default_value = "poll")]
    pub follow: FollowBackend,

    /// Wait in milliseconds before retrying when no new data is available
    #[arg(long = "poll-interval", default_value = "1000")]
    pub poll_interval: u64,

    /// Print a shell completion script and exit
    #[arg(long = "completions", value_name = "SHELL")]
    pub completions: Option<Shell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    History,
    Last,
    Watch,
}

impl Args {
    /// Parse arguments, accepting `-history`, `-last` and `-watch`.
    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// Selected mode. History wins over last, last over watch.
    pub fn mode(&self) -> Option<Mode> {
        if self.history {
            Some(Mode::History)
        } else if self.last {
            Some(Mode::Last)
        } else if self.watch {
            Some(Mode::Watch)
        } else {
            None
        }
    }

    pub fn usage() -> String {
        Self::command().render_usage().to_string()
    }
}

/// Rewrite `-history` as `--history` (likewise `-last`, `-watch`).
/// Everything else passes through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let legacy = arg
                .to_str()
                .and_then(|s| s.strip_prefix('-'))
                .filter(|name| LEGACY_FLAGS.contains(name));

            match legacy {
                Some(name) => OsString::from(format!("--{}", name)),
                None => arg,
            }
        })
        .collect()
}
