use anyhow::Result;
use serde_json::json;

use crate::commands::{CommandReport, config_or_issue};
use crate::rollcall::paths::resolve_paths;
use crate::rollcall::store::Store;

pub fn run(binary: Option<&str>, limit: usize) -> Result<CommandReport> {
    let mut report = CommandReport::new("releases");
    let paths = resolve_paths()?;
    let Some(cfg) = config_or_issue(&paths, &mut report) else {
        return Ok(report);
    };
    if !cfg.store.db_path.exists() {
        report.issue(format!("store not found at {}", cfg.store.db_path.display()));
        return Ok(report);
    }
    let store = Store::open_read_only(&cfg.store.db_path)?;

    let Some(binary) = binary else {
        let releases = store.releases()?;
        for r in &releases {
            report.detail(format!(
                "{} action={} updated={} tag={} hosts={}",
                r.binary_name,
                r.last_action,
                r.last_updated,
                r.git_tag.as_deref().unwrap_or("-"),
                r.hosts.join(",")
            ));
        }
        report.attach(&releases)?;
        return Ok(report);
    };

    let Some(snapshot) = store.release(binary)? else {
        report.issue(format!("no release recorded for binary `{binary}`"));
        return Ok(report);
    };
    let history = store.release_history(binary, limit)?;
    report.detail(format!(
        "{} action={} updated={} current={} new={} old={}",
        snapshot.binary_name,
        snapshot.last_action,
        snapshot.last_updated,
        snapshot.has_current,
        snapshot.has_new,
        snapshot.has_old
    ));
    for h in &history {
        report.detail(format!(
            "history {} {} tag={} from={}",
            h.timestamp,
            h.action,
            h.git_tag.as_deref().unwrap_or("-"),
            h.ingested_from
        ));
    }
    report.attach(&json!({ "snapshot": snapshot, "history": history }))?;
    Ok(report)
}
