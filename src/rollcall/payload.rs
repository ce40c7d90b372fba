use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseAction {
    Release,
    Promote,
    Rollback,
}

impl ReleaseAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Promote => "promote",
            Self::Rollback => "rollback",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "release" => Some(Self::Release),
            "promote" => Some(Self::Promote),
            "rollback" => Some(Self::Rollback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SlotState {
    #[serde(default)]
    pub exists: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SlotStates {
    #[serde(default)]
    pub current: SlotState,
    #[serde(default)]
    pub new: SlotState,
    #[serde(default)]
    pub old: SlotState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseDetails {
    pub source_size: Option<i64>,
    pub source_path: Option<String>,
    pub operation: Option<String>,
}

/// Release-lifecycle report as written by the deploy tooling.
///
/// `binary_name` and `action` are optional at the serde level so that a missing
/// field is reported as a named validation failure instead of a generic parse error.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseEvent {
    pub binary_name: Option<String>,
    pub action: Option<String>,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub hosts: Option<Vec<String>>,
    #[serde(default, alias = "version_tag")]
    pub git_tag: Option<String>,
    #[serde(default)]
    pub states: Option<SlotStates>,
    #[serde(default)]
    pub details: Option<ReleaseDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybookStatus {
    pub playbook: Option<String>,
    pub timestamp: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub hosts: Option<Vec<String>>,
    #[serde(default)]
    pub details: Option<Value>,
}

fn required(field: &str, value: Option<String>) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(format!("`{field}` is empty")),
        None => Err(format!("missing required field `{field}`")),
    }
}

/// Release event with required fields checked. Timestamp resolution happens later
/// because the filename may supply it.
#[derive(Debug, Clone)]
pub struct ValidRelease {
    pub binary_name: String,
    pub action: ReleaseAction,
    pub timestamp: Option<String>,
    pub hosts: Vec<String>,
    pub git_tag: Option<String>,
    pub slots: SlotStates,
    pub details: ReleaseDetails,
}

impl ReleaseEvent {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(bytes).map_err(|err| format!("invalid release json: {err}"))
    }

    pub fn validate(self) -> Result<ValidRelease, String> {
        let binary_name = required("binary_name", self.binary_name)?;
        let action_raw = required("action", self.action)?;
        let action = ReleaseAction::from_token(&action_raw)
            .ok_or_else(|| format!("unknown action `{action_raw}`"))?;
        Ok(ValidRelease {
            binary_name,
            action,
            timestamp: self.timestamp,
            hosts: self.hosts.unwrap_or_default(),
            git_tag: self.git_tag.filter(|tag| !tag.trim().is_empty()),
            slots: self.states.unwrap_or_default(),
            details: self.details.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ValidPlaybook {
    pub playbook: String,
    pub timestamp: String,
    pub status: String,
    pub hosts: Vec<String>,
    pub details: Value,
}

impl PlaybookStatus {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(bytes).map_err(|err| format!("invalid playbook json: {err}"))
    }

    pub fn validate(self) -> Result<ValidPlaybook, String> {
        Ok(ValidPlaybook {
            playbook: required("playbook", self.playbook)?,
            timestamp: required("timestamp", self.timestamp)?,
            status: required("status", self.status)?,
            hosts: self.hosts.unwrap_or_default(),
            details: self.details.unwrap_or_else(|| Value::Array(Vec::new())),
        })
    }
}
