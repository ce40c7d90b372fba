use anyhow::Result;
use std::env;

use crate::commands::{CommandReport, config_or_issue};
use crate::rollcall::paths::resolve_paths;
use crate::rollcall::store::Store;

include!(concat!(env!("OUT_DIR"), "/env_allowlist.rs"));

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("rollcall_home={}", paths.rollcall_home.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("config_file={}", paths.config_file().display()));

    let Some(cfg) = config_or_issue(&paths, &mut report) else {
        return Ok(report);
    };
    report.detail(format!("db_path={}", cfg.store.db_path.display()));
    report.detail(format!("playbooks_dir={}", cfg.watch.playbooks_dir.display()));
    report.detail(format!("releases_dir={}", cfg.watch.releases_dir.display()));
    report.detail(format!("queue_capacity={}", cfg.watch.queue_capacity));
    report.detail(format!("settle_ms={}", cfg.watch.settle_ms));
    report.detail(format!("ignore_suffixes={}", cfg.watch.ignore_suffixes.join(",")));
    report.detail(format!("filename_timezone={}", cfg.filename_timezone()));

    for var in GENERATED_ENV_ALLOWLIST {
        if env::var_os(var).is_some() {
            report.detail(format!("env.{var}=set"));
        }
    }

    for (name, dir) in [
        ("playbooks_dir", &cfg.watch.playbooks_dir),
        ("releases_dir", &cfg.watch.releases_dir),
    ] {
        if !dir.is_dir() {
            report.issue(format!("missing {name} ({})", dir.display()));
        }
    }

    if !cfg.store.db_path.exists() {
        report.detail("store=not_created (run `rollcall watch` first)");
        return Ok(report);
    }
    match Store::open_read_only(&cfg.store.db_path).and_then(|s| Ok(s.counts()?)) {
        Ok(counts) => {
            report.detail(format!("store.releases={}", counts.releases));
            report.detail(format!("store.release_history={}", counts.release_history));
            report.detail(format!("store.playbooks={}", counts.playbooks));
            report.detail(format!("store.playbook_history={}", counts.playbook_history));
            report.detail(format!("store.ingested_files={}", counts.ingested_files));
            report.attach(&counts)?;
        }
        Err(err) => report.issue(format!("store unreadable: {err:#}")),
    }

    Ok(report)
}
