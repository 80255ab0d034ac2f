use crate::error::{Result, SshLogError};
use clap::ValueEnum;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::{File, Metadata};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How new log lines are obtained in watch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FollowBackend {
    /// Poll the file with a tracked offset
    Poll,
    /// Consume the output of `tail -F`
    Tail,
}

#[derive(Debug)]
pub enum FollowEvent {
    Line(String),
    Failed(String),
}

/// Handle to a running follow task. Dropping it stops the task and, for the
/// tail backend, kills the child process.
#[derive(Debug)]
pub struct Follower {
    task: JoinHandle<()>,
}

impl Follower {
    pub fn spawn(
        backend: FollowBackend,
        path: &Path,
        poll_interval: Duration,
        tx: mpsc::Sender<FollowEvent>,
    ) -> Result<Self> {
        let task = match backend {
            FollowBackend::Poll => {
                let tail = PollTail::open(path)?;
                tokio::spawn(run_poll(tail, poll_interval, tx))
            }
            FollowBackend::Tail => spawn_tail(path, poll_interval, tx)?,
        };

        Ok(Self { task })
    }
}

impl Drop for Follower {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Offset-tracking reader over a growing file.
#[derive(Debug)]
pub struct PollTail {
    path: PathBuf,
    file: File,
    offset: u64,
    identity: Option<(u64, u64)>,
    pending: Vec<u8>,
}

impl PollTail {
    /// Open `path` positioned at its current end.
    pub fn open(path: &Path) -> Result<Self> {
        let unavailable = |source| SshLogError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unavailable)?;
        let metadata = file.metadata().map_err(unavailable)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: metadata.len(),
            identity: file_identity(&metadata),
            pending: Vec::new(),
        })
    }

    #[cfg(test)]
    fn offset(&self) -> u64 {
        self.offset
    }

    /// Return the complete lines appended since the last call. An
    /// unterminated trailing line is held until its newline arrives.
    pub fn poll(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();

        match std::fs::metadata(&self.path) {
            Ok(metadata) => {
                let identity = file_identity(&metadata);
                if identity.is_some() && identity != self.identity {
                    // Drain what was written to the old file before switching.
                    self.read_appended(&mut lines)?;
                    self.flush_pending(&mut lines);
                    self.reopen(identity)?;
                } else if metadata.len() < self.offset {
                    info!(path = %self.path.display(), "Log truncated, rewinding");
                    self.offset = 0;
                    self.pending.clear();
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Log missing, waiting for it to reappear");
            }
            Err(e) => return Err(e),
        }

        self.read_appended(&mut lines)?;
        Ok(lines)
    }

    fn reopen(&mut self, identity: Option<(u64, u64)>) -> io::Result<()> {
        match File::open(&self.path) {
            Ok(file) => {
                info!(path = %self.path.display(), "Log rotated, reopened");
                self.file = file;
                self.offset = 0;
                self.identity = identity;
                Ok(())
            }
            // Replaced again between the stat and the open; retry next poll.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn read_appended(&mut self, lines: &mut Vec<String>) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.offset))?;

        let mut chunk = Vec::new();
        let read = self.file.read_to_end(&mut chunk)?;
        self.offset += read as u64;
        self.pending.extend_from_slice(&chunk);

        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            if let Some(line) = decode_line(&raw) {
                lines.push(line);
            }
        }

        Ok(())
    }

    fn flush_pending(&mut self, lines: &mut Vec<String>) {
        let raw = std::mem::take(&mut self.pending);
        if let Some(line) = decode_line(&raw) {
            lines.push(line);
        }
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

#[cfg(unix)]
fn file_identity(metadata: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn file_identity(_metadata: &Metadata) -> Option<(u64, u64)> {
    None
}

fn watch_for_changes(path: &Path, wake: Arc<Notify>) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                wake.notify_one();
            }
        }
    })?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

async fn run_poll(mut tail: PollTail, interval: Duration, tx: mpsc::Sender<FollowEvent>) {
    let wake = Arc::new(Notify::new());
    // Held for the life of the loop; change events only shorten the wait.
    let _watcher = match watch_for_changes(&tail.path, wake.clone()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("File change events unavailable, polling only: {}", e);
            None
        }
    };

    loop {
        match tail.poll() {
            Ok(lines) if lines.is_empty() => {
                tokio::select! {
                    _ = wake.notified() => {}
                    _ = sleep(interval) => {}
                }
            }
            Ok(lines) => {
                for line in lines {
                    if tx.send(FollowEvent::Line(line)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(FollowEvent::Failed(e.to_string())).await;
                return;
            }
        }
    }
}

fn spawn_tail(
    path: &Path,
    interval: Duration,
    tx: mpsc::Sender<FollowEvent>,
) -> Result<JoinHandle<()>> {
    // Check readability up front; tail -F would otherwise wait silently.
    File::open(path).map_err(|source| SshLogError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut command = Command::new("tail");
    command.args(["-F", "-n", "0"]).arg(path);
    spawn_follow_process(command, interval, tx)
}

/// Run `command` and forward each line of its stdout. The child is killed
/// when the returned task is dropped or aborted; its exit is a failure.
fn spawn_follow_process(
    mut command: Command,
    interval: Duration,
    tx: mpsc::Sender<FollowEvent>,
) -> Result<JoinHandle<()>> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| SshLogError::FollowFailed(format!("cannot spawn {}: {}", program, e)))?;

    let stdout = child.stdout.take().ok_or_else(|| {
        SshLogError::FollowFailed(format!("{} stdout not captured", program))
    })?;

    Ok(tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => match child.try_wait() {
                    Ok(Some(status)) => {
                        let _ = tx
                            .send(FollowEvent::Failed(format!(
                                "{} exited with {}",
                                program, status
                            )))
                            .await;
                        return;
                    }
                    Ok(None) => sleep(interval).await,
                    Err(e) => {
                        let _ = tx.send(FollowEvent::Failed(e.to_string())).await;
                        return;
                    }
                },
                Ok(_) => {
                    if let Some(line) = decode_line(&buf) {
                        if tx.send(FollowEvent::Line(line)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(FollowEvent::Failed(e.to_string())).await;
                    return;
                }
            }
        }
    }))
}
