use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Tokens that mark a command as reading data.
const READ_TOKENS: &[&str] = &["cat", "less", "grep"];
/// Tokens that mark a command as modifying data.
const CHANGE_TOKENS: &[&str] = &["nano", "vim", "echo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Read,
    Changed,
    Unknown,
}

impl ActionKind {
    /// Classify a sudo command by case-insensitive substring match.
    ///
    /// Read tokens are checked before change tokens, so a command such as
    /// `cat notes | vim -` is a read.
    pub fn classify(command: &str) -> Self {
        let lowered = command.to_lowercase();

        if READ_TOKENS.iter().any(|token| lowered.contains(token)) {
            ActionKind::Read
        } else if CHANGE_TOKENS.iter().any(|token| lowered.contains(token)) {
            ActionKind::Changed
        } else {
            ActionKind::Unknown
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            ActionKind::Read => "📖",
            ActionKind::Changed => "✏️",
            ActionKind::Unknown => "?",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Read => "read",
            ActionKind::Changed => "changed",
            ActionKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A privileged command attributed to a login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub timestamp: NaiveDateTime,
    pub kind: ActionKind,
    pub command: String,
}

impl Action {
    pub fn new(timestamp: NaiveDateTime, command: &str) -> Self {
        Self {
            timestamp,
            kind: ActionKind::classify(command),
            command: command.to_string(),
        }
    }
}

/// A successful SSH authentication parsed from the log, together with the
/// sudo commands the same user ran before the next login was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginEvent {
    pub timestamp: NaiveDateTime,
    pub user: String,
    pub source_ip: String,
    pub method: String,
    pub port: String,
    pub actions: Vec<Action>,
}

impl LoginEvent {
    pub fn new(timestamp: NaiveDateTime, fields: LoginFields) -> Self {
        Self {
            timestamp,
            user: fields.user,
            source_ip: fields.source_ip,
            method: fields.method,
            port: fields.port,
            actions: Vec::new(),
        }
    }
}

/// Fields captured from an `Accepted ... ssh2` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFields {
    pub method: String,
    pub user: String,
    pub source_ip: String,
    pub port: String,
}

/// Fields captured from a `sudo: ... COMMAND=` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SudoFields {
    pub user: String,
    pub command: String,
}

/// A login seen while following the log. Stamped with the time it was
/// detected rather than the time written in the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginNotice {
    pub detected_at: DateTime<Local>,
    pub user: String,
    pub source_ip: String,
    pub method: String,
    pub port: String,
}

impl LoginNotice {
    pub fn new(detected_at: DateTime<Local>, fields: LoginFields) -> Self {
        Self {
            detected_at,
            user: fields.user,
            source_ip: fields.source_ip,
            method: fields.method,
            port: fields.port,
        }
    }
}
