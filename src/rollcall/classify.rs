use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Playbook,
    Release,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playbook => "playbook",
            Self::Release => "release",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ingest(FileKind),
    Hidden,
    NotJson,
    IgnoredSuffix(String),
    Unknown,
}

const RELEASE_TOKENS: [&str; 3] = ["release", "promote", "rollback"];

/// Route a file by name alone. Content is never inspected here.
pub fn classify_name(name: &str, ignore_suffixes: &[String]) -> Classification {
    if name.starts_with('.') {
        return Classification::Hidden;
    }
    if !name.ends_with(".json") {
        return Classification::NotJson;
    }
    if let Some(suffix) = ignore_suffixes
        .iter()
        .find(|suffix| !suffix.is_empty() && name.ends_with(suffix.as_str()))
    {
        return Classification::IgnoredSuffix(suffix.clone());
    }
    if name.contains("playbook") {
        return Classification::Ingest(FileKind::Playbook);
    }
    if RELEASE_TOKENS.iter().any(|token| name.contains(token)) {
        return Classification::Ingest(FileKind::Release);
    }
    Classification::Unknown
}

pub fn classify_path(path: &Path, ignore_suffixes: &[String]) -> Classification {
    match path.file_name().and_then(|s| s.to_str()) {
        Some(name) => classify_name(name, ignore_suffixes),
        None => Classification::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_suffixes() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn playbook_token_wins_over_release_tokens() {
        assert_eq!(
            classify_name("release_playbook_status.json", &no_suffixes()),
            Classification::Ingest(FileKind::Playbook)
        );
    }

    #[test]
    fn every_release_token_routes_to_release() {
        for name in [
            "agent_20240101_000000_release.json",
            "agent_20240101_000000_promote.json",
            "agent_20240101_000000_rollback.json",
        ] {
            assert_eq!(
                classify_name(name, &no_suffixes()),
                Classification::Ingest(FileKind::Release),
                "{name}"
            );
        }
    }

    #[test]
    fn hidden_and_foreign_files_are_not_ingested() {
        assert_eq!(
            classify_name(".agent_release.json.tmp", &no_suffixes()),
            Classification::Hidden
        );
        assert_eq!(
            classify_name("agent_release.yaml", &no_suffixes()),
            Classification::NotJson
        );
        assert_eq!(
            classify_name("inventory.json", &no_suffixes()),
            Classification::Unknown
        );
    }

    #[test]
    fn ignored_suffix_is_checked_before_tokens() {
        let suffixes = vec!["_latest.json".to_string()];
        assert_eq!(
            classify_name("agent_release_latest.json", &suffixes),
            Classification::IgnoredSuffix("_latest.json".to_string())
        );
    }
}
