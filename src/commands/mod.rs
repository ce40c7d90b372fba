pub mod health;
pub mod ingest;
pub mod playbooks;
pub mod releases;
pub mod status;
pub mod stop;
pub mod watch;

use crate::error::DaemonErrorCode;
use crate::rollcall::config::{RollcallConfig, load_config};
use crate::rollcall::paths::RollcallPaths;
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
            data: None,
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    /// Attach structured rows; shown in full only with `--json`.
    pub fn attach<T: Serialize>(&mut self, value: &T) -> Result<()> {
        self.data = Some(serde_json::to_value(value)?);
        Ok(())
    }
}

/// Config problems become a report issue instead of a bare error.
pub fn config_or_issue(paths: &RollcallPaths, report: &mut CommandReport) -> Option<RollcallConfig> {
    match load_config(paths) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            report.issue(format!(
                "{}: {err:#}",
                DaemonErrorCode::E005ConfigInvalid.as_str()
            ));
            None
        }
    }
}
