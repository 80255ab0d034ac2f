use crate::config::Config;
use crate::error::SshLogError;
use crate::event::LoginNotice;
use crate::follower::{FollowEvent, Follower};
use crate::matcher::LineMatcher;
use crate::report::Reporter;
use anyhow::Result;
use chrono::{DateTime, Local};
use termcolor::WriteColor;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatcherStats {
    pub lines_seen: usize,
    pub logins_detected: usize,
}

/// Follows the auth log and reports each accepted login as it is written.
#[derive(Debug)]
pub struct LiveWatcher<W: WriteColor> {
    config: Config,
    matcher: LineMatcher,
    reporter: Reporter<W>,
    stats: WatcherStats,
}

impl<W: WriteColor> LiveWatcher<W> {
    pub fn new(config: Config, reporter: Reporter<W>) -> Self {
        Self {
            config,
            matcher: LineMatcher::new(),
            reporter,
            stats: WatcherStats::default(),
        }
    }

    pub fn stats(&self) -> &WatcherStats {
        &self.stats
    }

    pub fn reporter(&self) -> &Reporter<W> {
        &self.reporter
    }

    /// Follow until the stream fails or the operator interrupts.
    pub async fn run(&mut self) -> Result<()> {
        let (tx, rx) = mpsc::channel::<FollowEvent>(100);
        let follower = Follower::spawn(
            self.config.follow,
            &self.config.log_path,
            self.config.poll_interval,
            tx,
        )?;

        info!(
            path = %self.config.log_path.display(),
            backend = ?self.config.follow,
            "Watching for SSH logins"
        );
        self.reporter.print_info(&format!(
            "Watching {} for new SSH logins (Ctrl-C to stop)",
            self.config.log_path.display()
        ))?;

        let result = tokio::select! {
            result = self.follow(rx) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                Ok(())
            }
        };

        // Stops the follow task and any tail child before returning.
        drop(follower);
        info!(
            lines = self.stats.lines_seen,
            logins = self.stats.logins_detected,
            "Watch finished"
        );
        result
    }

    /// Consume follow events until the stream reports a failure or closes.
    pub async fn follow(&mut self, mut rx: mpsc::Receiver<FollowEvent>) -> Result<()> {
        while let Some(event) = rx.recv().await {
            match event {
                FollowEvent::Line(line) => {
                    self.process_line(&line, Local::now())?;
                }
                FollowEvent::Failed(reason) => {
                    error!("Follow stream failed: {}", reason);
                    return Err(SshLogError::FollowFailed(reason).into());
                }
            }
        }

        Err(SshLogError::FollowFailed("follow stream closed".to_string()).into())
    }

    /// Match one followed line and report it if it is a login. `now` is the
    /// detection time stamped on the notice.
    pub fn process_line(
        &mut self,
        line: &str,
        now: DateTime<Local>,
    ) -> Result<Option<LoginNotice>> {
        self.stats.lines_seen += 1;

        let Some(notice) = detect_login(&self.matcher, line, now) else {
            return Ok(None);
        };

        self.stats.logins_detected += 1;
        self.reporter.print_notice(&notice)?;
        Ok(Some(notice))
    }
}

/// Build a notice for `line` if it records an accepted login.
pub fn detect_login(
    matcher: &LineMatcher,
    line: &str,
    now: DateTime<Local>,
) -> Option<LoginNotice> {
    matcher
        .match_login(line)
        .map(|fields| LoginNotice::new(now, fields))
}
