#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub struct Layout {
    pub home: PathBuf,
    pub status_dir: PathBuf,
    pub release_dir: PathBuf,
    pub db: PathBuf,
}

impl Layout {
    pub fn new(root: &Path) -> Self {
        let home = root.join("rollcall");
        let layout = Self {
            status_dir: home.join("status"),
            release_dir: home.join("releases"),
            db: home.join("db/dashboard.db"),
            home,
        };
        fs::create_dir_all(&layout.status_dir).expect("mkdir status");
        fs::create_dir_all(&layout.release_dir).expect("mkdir releases");
        layout
    }

    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("rollcall");
        cmd.current_dir(&self.home)
            .env("ROLLCALL_HOME", &self.home)
            .env("ROLLCALL_SETTLE_MS", "0")
            .env_remove("ROLLCALL_CONFIG_PATH")
            .env_remove("ROLLCALL_LOGS_DIR")
            .env_remove("ROLLCALL_DB_FILE")
            .env_remove("ROLLCALL_STATUS_DIR")
            .env_remove("ROLLCALL_RELEASE_DIR")
            .env_remove("DATABASE_FILE")
            .env_remove("STATUS_DIR")
            .env_remove("RELEASE_DIR");
        cmd
    }

    pub fn write_release(&self, name: &str, binary: &str, action: &str, hosts: &[&str]) -> PathBuf {
        let path = self.release_dir.join(name);
        let body = serde_json::json!({
            "binary_name": binary,
            "action": action,
            "timestamp": "2024-01-01T00:00:00Z",
            "hosts": hosts,
            "version_tag": "v2.0.0",
            "states": {"current": {"exists": true}, "new": {"exists": false}, "old": {"exists": true}},
            "details": {"source_size": 4096, "source_path": "/build/agent", "operation": action}
        });
        fs::write(&path, body.to_string()).expect("write release");
        path
    }

    pub fn write_playbook(&self, name: &str, playbook: &str, status: &str) -> PathBuf {
        let path = self.status_dir.join(name);
        let body = serde_json::json!({
            "playbook": playbook,
            "timestamp": "2024-01-02T10:00:00Z",
            "status": status,
            "hosts": ["web1", "web2"],
            "details": [{"host": "web1", "changed": 2}]
        });
        fs::write(&path, body.to_string()).expect("write playbook");
        path
    }

    pub fn count(&self, table: &str) -> i64 {
        let conn = rusqlite::Connection::open(&self.db).expect("open db");
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("count")
    }
}
