use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, config_or_issue};
use crate::rollcall::engine::IngestOutcome;
use crate::rollcall::paths::resolve_paths;
use crate::rollcall::watcher;

pub fn run(files: &[PathBuf]) -> Result<CommandReport> {
    let mut report = CommandReport::new("ingest");
    let paths = resolve_paths()?;
    let Some(cfg) = config_or_issue(&paths, &mut report) else {
        return Ok(report);
    };

    let (_lock, mut ingestor) = watcher::open_writer(&paths, &cfg)?;
    for file in files {
        match ingestor.process(file) {
            Ok(IngestOutcome::Ingested {
                kind,
                entity,
                snapshot_advanced,
            }) => report.detail(format!(
                "ingested {} kind={} entity={entity} snapshot_advanced={snapshot_advanced}",
                file.display(),
                kind.as_str()
            )),
            Ok(IngestOutcome::Duplicate { kind }) => report.detail(format!(
                "duplicate {} kind={}",
                file.display(),
                kind.as_str()
            )),
            Ok(IngestOutcome::Skipped(reason)) => {
                report.detail(format!("skipped {} reason={reason:?}", file.display()))
            }
            Err(err) => report.issue(format!("{}: {err}", err.code().as_str())),
        }
    }
    let counts = ingestor.store().counts()?;
    report.detail(format!(
        "store.release_history={} store.playbook_history={} store.ingested_files={}",
        counts.release_history, counts.playbook_history, counts.ingested_files
    ));
    report.attach(ingestor.stats())?;
    Ok(report)
}
