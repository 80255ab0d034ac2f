use assert_cmd::Command;
use predicates::prelude::*;
use std::io::{BufRead, BufReader, Write};
use std::process::Stdio;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const ALICE_LOGIN: &str =
    "Jan 2 10:00:00 host sshd[1]: Accepted password for alice from 10.0.0.5 port 51515 ssh2";
const ALICE_CAT: &str = "Jan 2 10:00:05 host sudo:   alice : TTY=pts/0 ; PWD=/home/alice ; USER=root ; COMMAND=/bin/cat /etc/shadow";
const BOB_VIM: &str = "Jan 2 10:00:06 host sudo:   bob : TTY=pts/1 ; PWD=/home/bob ; USER=root ; COMMAND=/usr/bin/vim /etc/hosts";

fn write_log(lines: &[&str]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(temp_file, "{}", line).unwrap();
    }
    temp_file.flush().unwrap();
    temp_file
}

fn sshlogtool() -> Command {
    let mut cmd = Command::cargo_bin("sshlogtool").unwrap();
    cmd.env_remove("SSHLOGTOOL_FILE").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_output() {
    let mut cmd = sshlogtool();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("parses an authentication log"))
        .stdout(predicate::str::contains("--history"));
}

#[test]
fn test_short_help_output() {
    let mut cmd = sshlogtool();
    cmd.arg("-h");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("SSH login monitor"));
}

#[test]
fn test_version_output() {
    let mut cmd = sshlogtool();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("sshlogtool 0.2.0"));
}

#[test]
fn test_no_mode_prints_usage() {
    let mut cmd = sshlogtool();
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_invalid_flag_exits_one() {
    let mut cmd = sshlogtool();
    cmd.arg("-bogus");
    cmd.assert().code(1);
}

#[test]
fn test_history_attaches_read_action() {
    let log = write_log(&[ALICE_LOGIN, ALICE_CAT]);

    let mut cmd = sshlogtool();
    cmd.args(["-history", "--no-color", "--file"]).arg(log.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("SSH login detected:").count(1))
        .stdout(predicate::str::contains("  • User: alice"))
        .stdout(predicate::str::contains("  • Source IP: 10.0.0.5"))
        .stdout(predicate::str::contains("  • Method: password"))
        .stdout(predicate::str::contains("  • Port: 51515"))
        .stdout(predicate::str::contains("→ [10:00:05] 📖 /bin/cat /etc/shadow"));
}

#[test]
fn test_history_drops_other_users_command() {
    let log = write_log(&[ALICE_LOGIN, BOB_VIM]);

    let mut cmd = sshlogtool();
    cmd.args(["-history", "--no-color", "--file"]).arg(log.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Actions: (none tracked)"))
        .stdout(predicate::str::contains("/usr/bin/vim").not());
}

#[test]
fn test_history_drops_command_before_login() {
    let log = write_log(&[ALICE_CAT, ALICE_LOGIN]);

    let mut cmd = sshlogtool();
    cmd.args(["-history", "--no-color", "--file"]).arg(log.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Actions: (none tracked)"))
        .stdout(predicate::str::contains("/etc/shadow").not());
}

#[test]
fn test_history_empty_log() {
    let log = write_log(&["short", ""]);

    let mut cmd = sshlogtool();
    cmd.args(["-history", "--file"]).arg(log.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No SSH login history found."));
}

#[test]
fn test_last_with_no_logins() {
    let log = write_log(&[ALICE_CAT]);

    let mut cmd = sshlogtool();
    cmd.args(["-last", "--file"]).arg(log.path());

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("No SSH logins found."));
}

#[test]
fn test_last_json() {
    let log = write_log(&[
        ALICE_LOGIN,
        "Jan 2 11:00:00 host sshd[2]: Accepted publickey for bob from 10.0.0.6 port 40000 ssh2",
        BOB_VIM,
    ]);

    let mut cmd = sshlogtool();
    cmd.args(["-last", "--json", "--file"]).arg(log.path());

    let output = cmd.assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["user"], "bob");
    assert_eq!(value["method"], "publickey");
    assert_eq!(value["actions"][0]["kind"], "changed");
}

#[test]
fn test_missing_log_exits_one() {
    let mut cmd = sshlogtool();
    cmd.args(["-history", "--no-color", "--file", "/non/existent/auth.log"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("cannot open /non/existent/auth.log"))
        .stderr(predicate::str::contains("os error").count(1));
}

#[test]
fn test_watch_missing_log_exits_one() {
    let mut cmd = sshlogtool();
    cmd.args(["-watch", "--no-color", "--file", "/non/existent/auth.log"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("cannot open"));
}

#[test]
fn test_zero_poll_interval_is_rejected() {
    let mut cmd = sshlogtool();
    cmd.args(["-watch", "--poll-interval", "0"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_completions() {
    let mut cmd = sshlogtool();
    cmd.args(["--completions", "bash"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("sshlogtool"));
}

#[test]
fn test_watch_reports_appended_login() {
    let log = write_log(&[ALICE_LOGIN]);

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("sshlogtool"))
        .args(["-watch", "--no-color", "--poll-interval", "50", "--file"])
        .arg(log.path())
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut appender = std::fs::OpenOptions::new()
        .append(true)
        .open(log.path())
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut output = Vec::new();

    // Keep appending until the watcher (which starts at end of file) sees one.
    while Instant::now() < deadline && !output.iter().any(|l: &String| l.contains("User: bob")) {
        writeln!(
            appender,
            "Jan 2 10:05:00 host sshd[7]: Accepted publickey for bob from 10.0.0.7 port 40000 ssh2"
        )
        .unwrap();
        appender.flush().unwrap();

        while let Ok(line) = rx.recv_timeout(Duration::from_millis(500)) {
            output.push(line);
        }
    }

    child.kill().unwrap();
    child.wait().unwrap();

    assert!(output.iter().any(|l| l.starts_with("[NEW LOGIN] ")));
    assert!(output.iter().any(|l| l == "  User: bob"));
    assert!(output.iter().any(|l| l == "  IP: 10.0.0.7"));
    assert!(output.iter().any(|l| l == "  Method: publickey"));
    assert!(!output.iter().any(|l| l.contains("User: alice")));
}

#[test]
fn test_repeated_mode_flag() {
    let log = write_log(&[ALICE_LOGIN]);

    let mut cmd = sshlogtool();
    cmd.args(["-last", "-last", "--no-color", "--file"]).arg(log.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("  • User: alice"));
}
