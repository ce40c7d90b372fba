use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use crate::commands::CommandReport;
use crate::rollcall::daemon_lock::{DaemonLock, LockAttempt, LockPayload};
use crate::rollcall::paths::resolve_paths;
use crate::rollcall::util::{ProcessState, inspect_process};

const STOP_TIMEOUT: Duration = Duration::from_secs(8);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What to do about the process named in a held lock.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StopPlan {
    /// The holder already exited; the lock will free itself.
    AwaitRelease,
    Terminate,
    Refuse(String),
}

fn is_watch_daemon(command_line: &str) -> bool {
    let mut parts = command_line.split_whitespace();
    let Some(program) = parts.next() else {
        return false;
    };
    program.ends_with("rollcall") && parts.any(|arg| arg == "watch")
}

fn plan(holder: &LockPayload, state: &ProcessState) -> StopPlan {
    match state {
        ProcessState::Gone | ProcessState::Zombie => StopPlan::AwaitRelease,
        ProcessState::Running { command } if is_watch_daemon(command) => StopPlan::Terminate,
        ProcessState::Running { command } => StopPlan::Refuse(format!(
            "refusing to stop pid {}; it holds the writer lock but is not `rollcall watch`: {}",
            holder.pid,
            if command.is_empty() { "<unknown>" } else { command }
        )),
    }
}

/// Poll the writer lock until the holder lets go. Taking it ourselves clears the file.
fn wait_for_release(lock_path: &Path) -> Result<bool> {
    let deadline = Instant::now() + STOP_TIMEOUT;
    loop {
        if let LockAttempt::Acquired(lock) = DaemonLock::acquire(lock_path)? {
            drop(lock);
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        thread::sleep(STOP_POLL_INTERVAL);
    }
}

fn send_sigterm(pid: u32) -> Result<()> {
    let status = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()
        .context("failed to send SIGTERM with `kill -TERM`")?;
    if !status.success() && inspect_process(pid)? != ProcessState::Gone {
        anyhow::bail!("`kill -TERM {pid}` failed and process is still alive");
    }
    Ok(())
}

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("stop");
    let lock_path = resolve_paths()?.daemon_lock();
    report.detail(format!("daemon_lock={}", lock_path.display()));

    if !lock_path.exists() {
        report.detail("watch daemon already stopped (lock file not found)");
        return Ok(report);
    }

    let holder = match DaemonLock::acquire(&lock_path)? {
        LockAttempt::Acquired(lock) => {
            drop(lock);
            report.detail("no writer held the lock; removed stale lock file");
            return Ok(report);
        }
        LockAttempt::Held { holder: None } => {
            report.issue("writer lock is held but its payload is unreadable");
            return Ok(report);
        }
        LockAttempt::Held {
            holder: Some(holder),
        } => holder,
    };
    report.detail(format!("daemon_pid={}", holder.pid));
    report.detail(format!("daemon_start_time={}", holder.start_time));

    match plan(&holder, &inspect_process(holder.pid)?) {
        StopPlan::Refuse(reason) => {
            report.issue(reason);
            return Ok(report);
        }
        StopPlan::AwaitRelease => {
            report.detail(format!("daemon pid {} is no longer running", holder.pid));
        }
        StopPlan::Terminate => send_sigterm(holder.pid)?,
    }

    if wait_for_release(&lock_path)? {
        report.detail(format!("stopped watch daemon pid={}", holder.pid));
    } else {
        report.issue(format!(
            "timed out waiting for daemon pid {} to release the writer lock after {}s",
            holder.pid,
            STOP_TIMEOUT.as_secs()
        ));
    }
    Ok(report)
}
