use crate::cli::Mode;
use crate::config::Config;
use crate::parser::LogParser;
use crate::report::Reporter;
use anyhow::Result;
use termcolor::WriteColor;
use tracing::info;

/// Parse the whole log once and print it according to `config.mode`.
/// History prints every login; last prints only the most recent one.
pub fn run_history<W: WriteColor>(
    config: &Config,
    parser: &LogParser,
    reporter: &mut Reporter<W>,
) -> Result<()> {
    let logins = parser.parse_file(&config.log_path)?;
    info!(
        path = %config.log_path.display(),
        logins = logins.len(),
        "Parsed auth log"
    );

    match (config.mode, config.json) {
        (Mode::Last, true) => reporter.print_json(&logins.last()),
        (Mode::Last, false) => reporter.print_last(logins.last()),
        (_, true) => reporter.print_json(&logins),
        (_, false) => reporter.print_history(&logins),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::follower::FollowBackend;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use termcolor::NoColor;

    fn create_test_config(mode: Mode, path: &Path, json: bool) -> Config {
        Config {
            mode,
            log_path: path.to_path_buf(),
            json,
            no_color: true,
            follow: FollowBackend::Poll,
            poll_interval: Duration::from_millis(1000),
        }
    }

    fn run(mode: Mode, path: &Path, json: bool) -> Result<String> {
        let config = create_test_config(mode, path, json);
        let mut reporter = Reporter::new(NoColor::new(Vec::new()), NoColor::new(Vec::new()));
        run_history(&config, &LogParser::with_year(2024), &mut reporter)?;
        Ok(String::from_utf8(reporter.out().get_ref().clone())?)
    }

    fn write_log(lines: &[&str]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_last_prints_most_recent_login() {
        let log = write_log(&[
            "Jan 2 10:00:00 host sshd[1]: Accepted password for alice from 10.0.0.5 port 51515 ssh2",
            "Jan 2 11:00:00 host sshd[2]: Accepted publickey for bob from 10.0.0.6 port 40000 ssh2",
        ]);

        let output = run(Mode::Last, log.path(), false).unwrap();
        assert!(output.starts_with("[2024-01-02 11:00:00] SSH login detected:"));
        assert!(output.contains("User: bob"));
        assert!(!output.contains("User: alice"));
    }

    #[test]
    fn test_last_on_empty_log() {
        let log = write_log(&["Jan 2 10:00:00 host CRON[5]: pam_unix(cron:session): session closed"]);

        let output = run(Mode::Last, log.path(), false).unwrap();
        assert_eq!(output, "No SSH logins found.\n");

        let output = run(Mode::Last, log.path(), true).unwrap();
        assert_eq!(output.trim(), "null");
    }

    #[test]
    fn test_history_json() {
        let log = write_log(&[
            "Jan 2 10:00:00 host sshd[1]: Accepted password for alice from 10.0.0.5 port 51515 ssh2",
            "Jan 2 10:00:05 host sudo:   alice : TTY=pts/0 ; PWD=/home/alice ; USER=root ; COMMAND=/bin/cat /etc/shadow",
        ]);

        let output = run(Mode::History, log.path(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["actions"][0]["kind"], "read");
    }

    #[test]
    fn test_missing_log_fails() {
        let result = run(Mode::History, &PathBuf::from("/non/existent/auth.log"), false);
        assert!(result.unwrap_err().to_string().contains("cannot open"));
    }
}
