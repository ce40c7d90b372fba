use anyhow::{Context, Result};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

pub fn pid_alive(pid: u32) -> bool {
    if cfg!(windows) {
        // The fs2 lock is the real liveness check on Windows.
        true
    } else {
        let Ok(status) = Command::new("kill").arg("-0").arg(pid.to_string()).status() else {
            return false;
        };
        status.success()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Gone,
    Zombie,
    Running { command: String },
}

/// Read one `ps -o stat= -o command=` line.
fn parse_ps_line(line: &str) -> ProcessState {
    let line = line.trim();
    let Some((stat, command)) = line.split_once(char::is_whitespace) else {
        return if line.is_empty() {
            ProcessState::Gone
        } else if line.starts_with('Z') {
            ProcessState::Zombie
        } else {
            ProcessState::Running {
                command: String::new(),
            }
        };
    };
    // Zombies still answer `kill -0`.
    if stat.starts_with('Z') {
        return ProcessState::Zombie;
    }
    ProcessState::Running {
        command: command.trim().to_string(),
    }
}

pub fn inspect_process(pid: u32) -> Result<ProcessState> {
    let output = Command::new("ps")
        .args(["-p", &pid.to_string(), "-o", "stat=", "-o", "command="])
        .output()
        .context("failed to inspect process with `ps`")?;
    if !output.status.success() {
        return Ok(ProcessState::Gone);
    }
    Ok(parse_ps_line(&String::from_utf8_lossy(&output.stdout)))
}
