use crate::error::{Result, SshLogError};
use crate::event::{Action, LoginEvent};
use crate::matcher::LineMatcher;
use chrono::{Datelike, Local, NaiveDateTime};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Width of the `Mon Day HH:MM:SS` prefix that leads every syslog line.
pub const TIMESTAMP_PREFIX_LEN: usize = 15;

const TIMESTAMP_FORMAT: &str = "%Y %b %e %H:%M:%S";

/// Counters gathered during one parse pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseStats {
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub logins_found: usize,
    pub actions_attached: usize,
    pub sudo_dropped: usize,
}

/// Parse the syslog timestamp at the start of `line`.
///
/// The log omits the year, so `year` is injected. A file that spans a year
/// boundary gets the wrong year for its older entries; nothing here tries
/// to infer a rollover.
pub fn parse_timestamp(line: &str, year: i32) -> Option<NaiveDateTime> {
    let prefix = line.get(..TIMESTAMP_PREFIX_LEN)?;
    let stamped = format!("{} {}", year, prefix.trim());
    NaiveDateTime::parse_from_str(&stamped, TIMESTAMP_FORMAT).ok()
}

/// Single-pass parser that turns auth log content into login records and
/// attaches sudo commands to the login they follow.
#[derive(Debug, Clone)]
pub struct LogParser {
    matcher: LineMatcher,
    year: i32,
}

impl LogParser {
    pub fn new() -> Self {
        Self::with_year(Local::now().year())
    }

    pub fn with_year(year: i32) -> Self {
        Self {
            matcher: LineMatcher::new(),
            year,
        }
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<LoginEvent>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SshLogError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        self.parse_reader(BufReader::new(file))
            .map_err(|source| SshLogError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R) -> io::Result<Vec<LoginEvent>> {
        let (logins, stats) = self.parse_reader_with_stats(reader)?;
        debug!(
            lines = stats.lines_read,
            skipped = stats.lines_skipped,
            logins = stats.logins_found,
            actions = stats.actions_attached,
            dropped = stats.sudo_dropped,
            "Parsed auth log"
        );
        Ok(logins)
    }

    pub fn parse_reader_with_stats<R: BufRead>(
        &self,
        mut reader: R,
    ) -> io::Result<(Vec<LoginEvent>, ParseStats)> {
        let mut logins: Vec<LoginEvent> = Vec::new();
        let mut stats = ParseStats::default();
        // Index of the login that sudo lines are attached to.
        let mut current: Option<usize> = None;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            stats.lines_read += 1;

            let line = String::from_utf8_lossy(trim_line_ending(&buf));
            if line.len() < TIMESTAMP_PREFIX_LEN {
                stats.lines_skipped += 1;
                continue;
            }

            let Some(timestamp) = parse_timestamp(&line, self.year) else {
                stats.lines_skipped += 1;
                continue;
            };

            if let Some(fields) = self.matcher.match_login(&line) {
                logins.push(LoginEvent::new(timestamp, fields));
                current = Some(logins.len() - 1);
                stats.logins_found += 1;
            } else if let Some(sudo) = self.matcher.match_sudo(&line) {
                match current.and_then(|index| logins.get_mut(index)) {
                    Some(login) if login.user == sudo.user => {
                        login.actions.push(Action::new(timestamp, &sudo.command));
                        stats.actions_attached += 1;
                    }
                    _ => stats.sudo_dropped += 1,
                }
            }
        }

        Ok((logins, stats))
    }
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
