use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RollcallPaths {
    pub rollcall_home: PathBuf,
    pub logs_dir: PathBuf,
    pub default_db_file: PathBuf,
    pub default_status_dir: PathBuf,
    pub default_release_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<RollcallPaths> {
    let rollcall_home = match env::var("ROLLCALL_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join(".rollcall"),
    };
    let logs_dir = env_or_default_path("ROLLCALL_LOGS_DIR", rollcall_home.join("logs"));

    Ok(RollcallPaths {
        default_db_file: rollcall_home.join("db").join("dashboard.db"),
        default_status_dir: rollcall_home.join("status"),
        default_release_dir: rollcall_home.join("releases"),
        logs_dir,
        rollcall_home,
    })
}

impl RollcallPaths {
    pub fn audit_log(&self) -> PathBuf {
        self.logs_dir.join("audit.log")
    }

    pub fn daemon_lock(&self) -> PathBuf {
        self.logs_dir.join("rollcall.lock")
    }

    pub fn config_file(&self) -> PathBuf {
        self.rollcall_home.join("rollcall.toml")
    }
}
