use crate::rollcall::paths::RollcallPaths;
use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub playbooks_dir: PathBuf,
    pub releases_dir: PathBuf,
    pub queue_capacity: usize,
    pub settle_ms: u64,
    pub ignore_suffixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampConfig {
    pub filename_timezone: String,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            filename_timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollcallConfig {
    pub store: StoreConfig,
    pub watch: WatchConfig,
    pub timestamps: TimestampConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialStoreConfig {
    db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialWatchConfig {
    playbooks_dir: Option<PathBuf>,
    releases_dir: Option<PathBuf>,
    queue_capacity: Option<usize>,
    settle_ms: Option<u64>,
    ignore_suffixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialRollcallConfig {
    store: Option<PartialStoreConfig>,
    watch: Option<PartialWatchConfig>,
    timestamps: Option<TimestampConfig>,
}

impl RollcallConfig {
    pub fn defaults(paths: &RollcallPaths) -> Self {
        Self {
            store: StoreConfig {
                db_path: paths.default_db_file.clone(),
            },
            watch: WatchConfig {
                playbooks_dir: paths.default_status_dir.clone(),
                releases_dir: paths.default_release_dir.clone(),
                queue_capacity: 1024,
                settle_ms: 200,
                ignore_suffixes: vec!["_latest.json".to_string()],
            },
            timestamps: TimestampConfig::default(),
        }
    }

    pub fn watch_dirs(&self) -> [&Path; 2] {
        [self.watch.playbooks_dir.as_path(), self.watch.releases_dir.as_path()]
    }

    /// Timezone that `<name>_<YYYYMMDD>_<HHMMSS>_...` filename stamps are written in.
    pub fn filename_timezone(&self) -> Tz {
        self.timestamps
            .filename_timezone
            .trim()
            .parse::<Tz>()
            .unwrap_or(chrono_tz::UTC)
    }
}

type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn lookup_first(lookup: EnvLookup<'_>, vars: &[&str]) -> Option<String> {
    for var in vars {
        if let Some(v) = lookup(var) {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn env_or_path_first(lookup: EnvLookup<'_>, vars: &[&str], fallback: &Path) -> PathBuf {
    lookup_first(lookup, vars)
        .map(PathBuf::from)
        .unwrap_or_else(|| fallback.to_path_buf())
}

fn env_or_u64(lookup: EnvLookup<'_>, var: &str, fallback: u64) -> u64 {
    lookup_first(lookup, &[var])
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn env_or_usize(lookup: EnvLookup<'_>, var: &str, fallback: usize) -> usize {
    lookup_first(lookup, &[var])
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(fallback)
}

fn env_or_string(lookup: EnvLookup<'_>, var: &str, fallback: &str) -> String {
    lookup_first(lookup, &[var]).unwrap_or_else(|| fallback.to_string())
}

fn env_or_csv(lookup: EnvLookup<'_>, var: &str, fallback: &[String]) -> Vec<String> {
    match lookup(var) {
        Some(v) => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>(),
        None => fallback.to_vec(),
    }
}

fn validate(cfg: &RollcallConfig) -> Result<()> {
    if cfg.store.db_path.as_os_str().is_empty() {
        return Err(anyhow!("invalid store path: cannot be empty"));
    }
    if cfg.watch.queue_capacity == 0 {
        return Err(anyhow!("invalid queue capacity: must be >= 1"));
    }
    if cfg.watch.playbooks_dir == cfg.watch.releases_dir {
        return Err(anyhow!(
            "invalid watch directories: playbooks and releases must differ ({})",
            cfg.watch.playbooks_dir.display()
        ));
    }
    let tz = cfg.timestamps.filename_timezone.trim();
    if tz.parse::<Tz>().is_err() {
        return Err(anyhow!("invalid filename timezone: `{tz}`"));
    }
    Ok(())
}

fn resolve_config_path(paths: &RollcallPaths, lookup: EnvLookup<'_>) -> PathBuf {
    lookup_first(lookup, &["ROLLCALL_CONFIG_PATH"])
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.config_file())
}

fn merge_toml(base: &mut RollcallConfig, raw: &str, origin: &Path) -> Result<()> {
    let parsed: PartialRollcallConfig = toml::from_str(raw)
        .map_err(|err| anyhow!("failed to parse rollcall config {}: {err}", origin.display()))?;

    if let Some(store) = parsed.store {
        if let Some(db_path) = store.db_path {
            base.store.db_path = db_path;
        }
    }
    if let Some(watch) = parsed.watch {
        if let Some(dir) = watch.playbooks_dir {
            base.watch.playbooks_dir = dir;
        }
        if let Some(dir) = watch.releases_dir {
            base.watch.releases_dir = dir;
        }
        if let Some(capacity) = watch.queue_capacity {
            base.watch.queue_capacity = capacity;
        }
        if let Some(settle_ms) = watch.settle_ms {
            base.watch.settle_ms = settle_ms;
        }
        if let Some(suffixes) = watch.ignore_suffixes {
            base.watch.ignore_suffixes = suffixes;
        }
    }
    if let Some(timestamps) = parsed.timestamps {
        base.timestamps = timestamps;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut RollcallConfig, lookup: EnvLookup<'_>) {
    cfg.store.db_path = env_or_path_first(
        lookup,
        &["ROLLCALL_DB_FILE", "DATABASE_FILE"],
        &cfg.store.db_path,
    );
    cfg.watch.playbooks_dir = env_or_path_first(
        lookup,
        &["ROLLCALL_STATUS_DIR", "STATUS_DIR"],
        &cfg.watch.playbooks_dir,
    );
    cfg.watch.releases_dir = env_or_path_first(
        lookup,
        &["ROLLCALL_RELEASE_DIR", "RELEASE_DIR"],
        &cfg.watch.releases_dir,
    );
    cfg.watch.queue_capacity =
        env_or_usize(lookup, "ROLLCALL_QUEUE_CAPACITY", cfg.watch.queue_capacity);
    cfg.watch.settle_ms = env_or_u64(lookup, "ROLLCALL_SETTLE_MS", cfg.watch.settle_ms);
    cfg.watch.ignore_suffixes = env_or_csv(
        lookup,
        "ROLLCALL_IGNORE_SUFFIXES",
        &cfg.watch.ignore_suffixes,
    );
    cfg.timestamps.filename_timezone = env_or_string(
        lookup,
        "ROLLCALL_FILENAME_TZ",
        &cfg.timestamps.filename_timezone,
    );
}

fn load_with(paths: &RollcallPaths, lookup: EnvLookup<'_>) -> Result<RollcallConfig> {
    let mut cfg = RollcallConfig::defaults(paths);

    let config_path = resolve_config_path(paths, lookup);
    if config_path.exists() {
        let raw = fs::read_to_string(&config_path)
            .map_err(|err| anyhow!("failed to read {}: {err}", config_path.display()))?;
        merge_toml(&mut cfg, &raw, &config_path)?;
    }

    apply_env_overrides(&mut cfg, lookup);
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_config(paths: &RollcallPaths) -> Result<RollcallConfig> {
    load_with(paths, &|var: &str| env::var(var).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_paths(root: &Path) -> RollcallPaths {
        RollcallPaths {
            rollcall_home: root.to_path_buf(),
            logs_dir: root.join("logs"),
            default_db_file: root.join("db/dashboard.db"),
            default_status_dir: root.join("status"),
            default_release_dir: root.join("releases"),
        }
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_follow_rollcall_home() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cfg = load_with(&test_paths(tmp.path()), &lookup_from(&[])).expect("config");
        assert_eq!(cfg.store.db_path, tmp.path().join("db/dashboard.db"));
        assert_eq!(cfg.watch.playbooks_dir, tmp.path().join("status"));
        assert_eq!(cfg.watch.releases_dir, tmp.path().join("releases"));
        assert_eq!(cfg.watch.ignore_suffixes, vec!["_latest.json".to_string()]);
        assert_eq!(cfg.filename_timezone(), chrono_tz::UTC);
    }

    #[test]
    fn legacy_env_names_apply_when_prefixed_ones_are_absent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let lookup = lookup_from(&[
            ("DATABASE_FILE", "/data/db/dashboard.db"),
            ("STATUS_DIR", "/data/status"),
            ("RELEASE_DIR", "/data/releases"),
            ("ROLLCALL_RELEASE_DIR", "/srv/releases"),
        ]);
        let cfg = load_with(&test_paths(tmp.path()), &lookup).expect("config");
        assert_eq!(cfg.store.db_path, PathBuf::from("/data/db/dashboard.db"));
        assert_eq!(cfg.watch.playbooks_dir, PathBuf::from("/data/status"));
        assert_eq!(cfg.watch.releases_dir, PathBuf::from("/srv/releases"));
    }

    #[test]
    fn toml_sections_merge_field_by_field() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = tmp.path().join("rollcall.toml");
        fs::write(
            &file,
            "[watch]\nsettle_ms = 0\nignore_suffixes = []\n\n[timestamps]\nfilename_timezone = \"Europe/Berlin\"\n",
        )
        .expect("write config");

        let cfg = load_with(&test_paths(tmp.path()), &lookup_from(&[])).expect("config");
        assert_eq!(cfg.watch.settle_ms, 0);
        assert!(cfg.watch.ignore_suffixes.is_empty());
        assert_eq!(cfg.watch.queue_capacity, 1024);
        assert_eq!(cfg.filename_timezone(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());

        let err = load_with(&paths, &lookup_from(&[("ROLLCALL_FILENAME_TZ", "Mars/Olympus")]))
            .expect_err("unknown timezone");
        assert!(err.to_string().contains("timezone"));

        let err = load_with(&paths, &lookup_from(&[("ROLLCALL_QUEUE_CAPACITY", "0")]))
            .expect_err("zero capacity");
        assert!(err.to_string().contains("queue capacity"));

        let err = load_with(
            &paths,
            &lookup_from(&[("STATUS_DIR", "/data/x"), ("RELEASE_DIR", "/data/x")]),
        )
        .expect_err("same dirs");
        assert!(err.to_string().contains("must differ"));
    }
}
