use anyhow::Result;

use crate::commands::{CommandReport, config_or_issue};
use crate::rollcall::paths::resolve_paths;
use crate::rollcall::reconcile::ReconcileOutcome;
use crate::rollcall::watcher;

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub once: bool,
}

fn reconcile_details(report: &mut CommandReport, prefix: &str, out: &ReconcileOutcome) {
    report.detail(format!("{prefix}.scanned={}", out.scanned));
    report.detail(format!("{prefix}.ingested={}", out.ingested));
    report.detail(format!("{prefix}.duplicates={}", out.duplicates));
    report.detail(format!("{prefix}.skipped={}", out.skipped));
    report.detail(format!("{prefix}.failed={}", out.failed));
    for dir in &out.missing_dirs {
        report.detail(format!("{prefix}.missing_dir={dir}"));
    }
}

pub fn run(opts: &WatchOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("watch");
    let paths = resolve_paths()?;
    let Some(cfg) = config_or_issue(&paths, &mut report) else {
        return Ok(report);
    };
    report.detail(format!("db_path={}", cfg.store.db_path.display()));
    report.detail(format!("playbooks_dir={}", cfg.watch.playbooks_dir.display()));
    report.detail(format!("releases_dir={}", cfg.watch.releases_dir.display()));

    if opts.once {
        let once = watcher::run_once(&paths, &cfg)?;
        report.detail("reconcile pass completed");
        reconcile_details(&mut report, "reconcile", &once.reconcile);
        report.attach(&once.stats)?;
        if once.reconcile.failed > 0 {
            report.detail(format!(
                "{} file(s) failed and stay eligible for retry",
                once.reconcile.failed
            ));
        }
        return Ok(report);
    }

    let outcome = watcher::run_daemon(&paths, &cfg)?;
    report.detail("watch daemon stopped");
    for dir in &outcome.watched {
        report.detail(format!("watched={}", dir.display()));
    }
    reconcile_details(&mut report, "startup", &outcome.startup);
    report.detail(format!("queue.files={}", outcome.queue.files));
    report.detail(format!("queue.rescans={}", outcome.queue.rescans));
    report.detail(format!("stats {}", outcome.stats.summary()));
    report.attach(&outcome.stats)?;
    Ok(report)
}
