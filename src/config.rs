use crate::cli::{Args, Mode};
use crate::follower::FollowBackend;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub log_path: PathBuf,
    pub json: bool,
    pub no_color: bool,
    pub follow: FollowBackend,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let mode = args
            .mode()
            .context("No mode selected: use -history, -last or -watch")?;

        if args.poll_interval == 0 {
            anyhow::bail!("Poll interval must be greater than zero");
        }

        if args.json && mode == Mode::Watch {
            anyhow::bail!("--json applies to -history and -last only");
        }

        Ok(Config {
            mode,
            log_path: args.file.clone(),
            json: args.json,
            no_color: args.no_color,
            follow: args.follow,
            poll_interval: Duration::from_millis(args.poll_interval),
        })
    }
}
