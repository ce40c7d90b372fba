use crate::rollcall::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub phase: String,
    pub status: String,
    pub message: String,
}

/// Append one JSON line to the audit log, creating its directory on first use.
pub fn append_event(log_path: &Path, phase: &str, status: &str, message: &str) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let event = AuditEvent {
        at_epoch_secs: now_epoch_secs()?,
        phase: phase.to_string(),
        status: status.to_string(),
        message: message.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Audit writes never interrupt ingestion; a failed append is only logged.
pub fn record(log_path: Option<&Path>, phase: &str, status: &str, message: &str) {
    let Some(log_path) = log_path else {
        return;
    };
    if let Err(err) = append_event(log_path, phase, status, message) {
        tracing::warn!(path = %log_path.display(), error = %format!("{err:#}"), "audit append failed");
    }
}
