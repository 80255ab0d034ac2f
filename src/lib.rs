pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod follower;
pub mod history;
pub mod matcher;
pub mod parser;
pub mod report;
pub mod watcher;

pub use cli::{Args, Mode};
pub use config::Config;
pub use error::SshLogError;
pub use event::{Action, ActionKind, LoginEvent, LoginNotice};
pub use follower::{FollowBackend, Follower};
pub use matcher::LineMatcher;
pub use parser::LogParser;
pub use report::Reporter;
pub use watcher::LiveWatcher;
