//! Error types for sshlogtool.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that end a mode. Malformed lines and momentary read gaps are
/// not represented here: the parser skips the former and the follower
/// retries on the latter.
#[derive(Error, Debug)]
pub enum SshLogError {
    #[error("cannot open {}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed reading {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log follow stream failed: {0}")]
    FollowFailed(String),
}

pub type Result<T> = std::result::Result<T, SshLogError>;
