use anyhow::Result;
use serde_json::json;

use crate::commands::{CommandReport, config_or_issue};
use crate::rollcall::paths::resolve_paths;
use crate::rollcall::store::Store;

pub fn run(name: Option<&str>, limit: usize) -> Result<CommandReport> {
    let mut report = CommandReport::new("playbooks");
    let paths = resolve_paths()?;
    let Some(cfg) = config_or_issue(&paths, &mut report) else {
        return Ok(report);
    };
    if !cfg.store.db_path.exists() {
        report.issue(format!("store not found at {}", cfg.store.db_path.display()));
        return Ok(report);
    }
    let store = Store::open_read_only(&cfg.store.db_path)?;

    let Some(name) = name else {
        let runs = store.playbooks()?;
        for run in &runs {
            report.detail(format!(
                "{} status={} last_run={} hosts={}",
                run.playbook_name,
                run.status,
                run.last_run,
                run.hosts.join(",")
            ));
        }
        report.attach(&runs)?;
        return Ok(report);
    };

    let Some(latest) = store.playbook(name)? else {
        report.issue(format!("no run recorded for playbook `{name}`"));
        return Ok(report);
    };
    let history = store.playbook_history(name, limit)?;
    report.detail(format!(
        "{} status={} last_run={}",
        latest.playbook_name, latest.status, latest.last_run
    ));
    for h in &history {
        report.detail(format!("history {} status={} from={}", h.timestamp, h.status, h.ingested_from));
    }
    report.attach(&json!({ "latest": latest, "history": history }))?;
    Ok(report)
}
