use crate::event::{LoginFields, SudoFields};
use regex::Regex;

/// `Accepted <method> for <user> from <ipv4> port <port> ssh2`
pub const LOGIN_PATTERN: &str = r"Accepted (\w+) for (\w+) from ([\d\.]+) port (\d+) ssh2";

/// `sudo: <user> : ... COMMAND=<command>`
pub const SUDO_PATTERN: &str = r"sudo: +(\w+) : .*COMMAND=(.+)";

/// Compiled login and sudo patterns shared by the parser and the watcher.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    login: Regex,
    sudo: Regex,
}

impl LineMatcher {
    pub fn new() -> Self {
        // Both patterns are constants covered by tests.
        Self {
            login: Regex::new(LOGIN_PATTERN).expect("login pattern is valid"),
            sudo: Regex::new(SUDO_PATTERN).expect("sudo pattern is valid"),
        }
    }

    pub fn match_login(&self, line: &str) -> Option<LoginFields> {
        let caps = self.login.captures(line)?;

        Some(LoginFields {
            method: caps[1].to_string(),
            user: caps[2].to_string(),
            source_ip: caps[3].to_string(),
            port: caps[4].to_string(),
        })
    }

    pub fn match_sudo(&self, line: &str) -> Option<SudoFields> {
        let caps = self.sudo.captures(line)?;

        Some(SudoFields {
            user: caps[1].to_string(),
            command: caps[2].to_string(),
        })
    }
}

impl Default for LineMatcher {
    fn default() -> Self {
        Self::new()
    }
}
