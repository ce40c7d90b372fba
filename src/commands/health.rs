use anyhow::Result;

use crate::commands::CommandReport;
use crate::rollcall::daemon_lock::read_lock_payload;
use crate::rollcall::paths::resolve_paths;
use crate::rollcall::util::pid_alive;

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("health");
    let paths = resolve_paths()?;

    report.detail(format!("rollcall_home={}", paths.rollcall_home.display()));
    if paths.logs_dir.exists() {
        report.detail("path.logs_dir=ok");
    } else {
        report.issue(format!("path.logs_dir=missing ({})", paths.logs_dir.display()));
    }

    let lock_path = paths.daemon_lock();
    if !lock_path.exists() {
        report.detail("daemon.lock=not_found (daemon likely not running)");
        return Ok(report);
    }

    match read_lock_payload(&lock_path) {
        Ok(payload) => {
            report.detail("daemon.lock=found");
            report.detail(format!("daemon.pid={}", payload.pid));
            report.detail(format!("daemon.build_uuid={}", payload.build_uuid));
            report.detail(format!("daemon.start_time={}", payload.start_time));

            if pid_alive(payload.pid) {
                report.detail("daemon.process=alive");
            } else {
                report.issue("daemon.process=dead (stale lock)");
            }

            let current = env!("BUILD_UUID");
            if payload.build_uuid == current {
                report.detail("daemon.build_match=ok");
            } else {
                report.issue(format!(
                    "daemon.build_mismatch=found (lock={} current={current})",
                    payload.build_uuid
                ));
            }
        }
        Err(err) => report.issue(format!("daemon.lock=unreadable ({err:#})")),
    }

    Ok(report)
}
