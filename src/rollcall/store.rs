//! SQLite store shared with the dashboard.
//!
//! The ingestion loop owns the only writable [`Store`]; every file's writes go
//! through [`Store::write`] so snapshot, history and ledger rows commit or roll
//! back together. Dashboard readers open with [`Store::open_read_only`] and, under
//! WAL, only ever see fully committed transactions.

use crate::rollcall::classify::FileKind;
use crate::rollcall::ledger::LedgerKey;
use crate::rollcall::payload::{ReleaseAction, ReleaseDetails, SlotStates};
use anyhow::{Context, Result, anyhow};
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS releases (
    binary_name TEXT PRIMARY KEY,
    last_updated TEXT NOT NULL,
    last_action TEXT NOT NULL,
    hosts TEXT NOT NULL DEFAULT '[]',
    has_current INTEGER NOT NULL DEFAULT 0,
    has_new INTEGER NOT NULL DEFAULT 0,
    has_old INTEGER NOT NULL DEFAULT 0,
    git_tag TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS release_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    binary_name TEXT NOT NULL REFERENCES releases(binary_name),
    timestamp TEXT NOT NULL,
    action TEXT NOT NULL,
    hosts TEXT NOT NULL DEFAULT '[]',
    source_size INTEGER,
    source_path TEXT,
    operation TEXT,
    git_tag TEXT,
    ingested_from TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS playbooks (
    playbook_name TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    status TEXT NOT NULL,
    hosts TEXT NOT NULL DEFAULT '[]',
    details TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS playbook_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    playbook_name TEXT NOT NULL REFERENCES playbooks(playbook_name),
    timestamp TEXT NOT NULL,
    status TEXT NOT NULL,
    hosts TEXT NOT NULL DEFAULT '[]',
    details TEXT NOT NULL DEFAULT '[]',
    ingested_from TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS file_hashes (
    file_path TEXT NOT NULL,
    file_hash TEXT NOT NULL,
    kind TEXT NOT NULL,
    ingested_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(file_path, file_hash)
);

CREATE INDEX IF NOT EXISTS idx_release_history_binary
    ON release_history(binary_name, timestamp);
CREATE INDEX IF NOT EXISTS idx_release_history_timestamp
    ON release_history(timestamp);
CREATE INDEX IF NOT EXISTS idx_playbook_history_name
    ON playbook_history(playbook_name, timestamp);

CREATE TRIGGER IF NOT EXISTS release_history_no_update
    BEFORE UPDATE ON release_history
    BEGIN SELECT RAISE(ABORT, 'release_history is append-only'); END;
CREATE TRIGGER IF NOT EXISTS release_history_no_delete
    BEFORE DELETE ON release_history
    BEGIN SELECT RAISE(ABORT, 'release_history is append-only'); END;
CREATE TRIGGER IF NOT EXISTS playbook_history_no_update
    BEFORE UPDATE ON playbook_history
    BEGIN SELECT RAISE(ABORT, 'playbook_history is append-only'); END;
CREATE TRIGGER IF NOT EXISTS playbook_history_no_delete
    BEFORE DELETE ON playbook_history
    BEGIN SELECT RAISE(ABORT, 'playbook_history is append-only'); END;
"#;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReleaseSnapshot {
    pub binary_name: String,
    pub last_updated: String,
    pub last_action: String,
    pub hosts: Vec<String>,
    pub has_current: bool,
    pub has_new: bool,
    pub has_old: bool,
    pub git_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReleaseHistoryEntry {
    pub id: i64,
    pub binary_name: String,
    pub timestamp: String,
    pub action: String,
    pub hosts: Vec<String>,
    pub source_size: Option<i64>,
    pub source_path: Option<String>,
    pub operation: Option<String>,
    pub git_tag: Option<String>,
    pub ingested_from: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaybookRun {
    pub playbook_name: String,
    pub last_run: String,
    pub status: String,
    pub hosts: Vec<String>,
    pub details: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaybookHistoryEntry {
    pub id: i64,
    pub playbook_name: String,
    pub timestamp: String,
    pub status: String,
    pub hosts: Vec<String>,
    pub details: Value,
    pub ingested_from: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StoreCounts {
    pub releases: i64,
    pub release_history: i64,
    pub playbooks: i64,
    pub playbook_history: i64,
    pub ingested_files: i64,
}

/// One release file, ready to be written.
#[derive(Debug, Clone)]
pub struct ReleaseWrite {
    pub binary_name: String,
    pub timestamp: String,
    pub action: ReleaseAction,
    pub hosts: Vec<String>,
    pub slots: SlotStates,
    pub git_tag: Option<String>,
    pub details: ReleaseDetails,
    pub ingested_from: String,
}

/// One playbook file, ready to be written.
#[derive(Debug, Clone)]
pub struct PlaybookWrite {
    pub playbook_name: String,
    pub timestamp: String,
    pub status: String,
    pub hosts: Vec<String>,
    pub details: Value,
    pub ingested_from: String,
}

pub struct Store {
    conn: Connection,
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn to_json_text<T: Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

fn release_from_row(row: &Row<'_>) -> rusqlite::Result<ReleaseSnapshot> {
    Ok(ReleaseSnapshot {
        binary_name: row.get(0)?,
        last_updated: row.get(1)?,
        last_action: row.get(2)?,
        hosts: json_column(row, 3)?,
        has_current: row.get(4)?,
        has_new: row.get(5)?,
        has_old: row.get(6)?,
        git_tag: row.get(7)?,
    })
}

fn playbook_from_row(row: &Row<'_>) -> rusqlite::Result<PlaybookRun> {
    Ok(PlaybookRun {
        playbook_name: row.get(0)?,
        last_run: row.get(1)?,
        status: row.get(2)?,
        hosts: json_column(row, 3)?,
        details: json_column(row, 4)?,
    })
}

impl Store {
    /// Open or create the writable store. Failure here is fatal to startup.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store {}", path.display()))?;
        let _mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .with_context(|| format!("failed to enable WAL on {}", path.display()))?;
        Self::init(conn).with_context(|| format!("failed to initialize store {}", path.display()))
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Read-only handle for query commands and the dashboard.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open store {} read-only", path.display()))?;
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version == 0 {
            return Err(anyhow!(
                "store {} has not been initialized by the ingestion daemon",
                path.display()
            ));
        }
        Ok(Self { conn })
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(anyhow!(
                "store schema version {version} is newer than supported version {SCHEMA_VERSION}"
            ));
        }
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        Ok(Self { conn })
    }

    /// Run `f` inside one immediate transaction; commit on `Ok`, roll back on `Err`.
    pub fn write<T, E>(&mut self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn ledger_contains(&self, key: &LedgerKey) -> rusqlite::Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM file_hashes WHERE file_path = ?1 AND file_hash = ?2 LIMIT 1",
                params![key.path, key.hash.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
    }

    pub fn releases(&self) -> rusqlite::Result<Vec<ReleaseSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT binary_name, last_updated, last_action, hosts, has_current, has_new, has_old, git_tag
             FROM releases ORDER BY binary_name",
        )?;
        let rows = stmt.query_map([], release_from_row)?;
        rows.collect()
    }

    pub fn release(&self, binary_name: &str) -> rusqlite::Result<Option<ReleaseSnapshot>> {
        self.conn
            .query_row(
                "SELECT binary_name, last_updated, last_action, hosts, has_current, has_new, has_old, git_tag
                 FROM releases WHERE binary_name = ?1",
                params![binary_name],
                release_from_row,
            )
            .optional()
    }

    /// Newest first; entries sharing a timestamp keep ingestion order.
    pub fn release_history(
        &self,
        binary_name: &str,
        limit: usize,
    ) -> rusqlite::Result<Vec<ReleaseHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, binary_name, timestamp, action, hosts, source_size, source_path, operation,
                    git_tag, ingested_from
             FROM release_history WHERE binary_name = ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![binary_name, limit as i64], |row| {
            Ok(ReleaseHistoryEntry {
                id: row.get(0)?,
                binary_name: row.get(1)?,
                timestamp: row.get(2)?,
                action: row.get(3)?,
                hosts: json_column(row, 4)?,
                source_size: row.get(5)?,
                source_path: row.get(6)?,
                operation: row.get(7)?,
                git_tag: row.get(8)?,
                ingested_from: row.get(9)?,
            })
        })?;
        rows.collect()
    }

    pub fn playbooks(&self) -> rusqlite::Result<Vec<PlaybookRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT playbook_name, timestamp, status, hosts, details
             FROM playbooks ORDER BY playbook_name",
        )?;
        let rows = stmt.query_map([], playbook_from_row)?;
        rows.collect()
    }

    pub fn playbook(&self, playbook_name: &str) -> rusqlite::Result<Option<PlaybookRun>> {
        self.conn
            .query_row(
                "SELECT playbook_name, timestamp, status, hosts, details
                 FROM playbooks WHERE playbook_name = ?1",
                params![playbook_name],
                playbook_from_row,
            )
            .optional()
    }

    pub fn playbook_history(
        &self,
        playbook_name: &str,
        limit: usize,
    ) -> rusqlite::Result<Vec<PlaybookHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, playbook_name, timestamp, status, hosts, details, ingested_from
             FROM playbook_history WHERE playbook_name = ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![playbook_name, limit as i64], |row| {
            Ok(PlaybookHistoryEntry {
                id: row.get(0)?,
                playbook_name: row.get(1)?,
                timestamp: row.get(2)?,
                status: row.get(3)?,
                hosts: json_column(row, 4)?,
                details: json_column(row, 5)?,
                ingested_from: row.get(6)?,
            })
        })?;
        rows.collect()
    }

    pub fn counts(&self) -> rusqlite::Result<StoreCounts> {
        let count = |table: &str| -> rusqlite::Result<i64> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        };
        Ok(StoreCounts {
            releases: count("releases")?,
            release_history: count("release_history")?,
            playbooks: count("playbooks")?,
            playbook_history: count("playbook_history")?,
            ingested_files: count("file_hashes")?,
        })
    }
}

/// Insert or advance the release snapshot.
///
/// The snapshot only moves when the incoming timestamp is not older than the
/// stored one. An empty host list never replaces stored hosts and a missing tag
/// never clears a stored tag. Returns whether the snapshot changed.
pub fn upsert_release_snapshot(tx: &Transaction<'_>, w: &ReleaseWrite) -> rusqlite::Result<bool> {
    let changed = tx.execute(
        "INSERT INTO releases (
             binary_name, last_updated, last_action, hosts, has_current, has_new, has_old, git_tag
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(binary_name) DO UPDATE SET
             last_updated = excluded.last_updated,
             last_action = excluded.last_action,
             hosts = CASE WHEN excluded.hosts = '[]' THEN releases.hosts ELSE excluded.hosts END,
             has_current = excluded.has_current,
             has_new = excluded.has_new,
             has_old = excluded.has_old,
             git_tag = COALESCE(excluded.git_tag, releases.git_tag)
         WHERE excluded.last_updated >= releases.last_updated",
        params![
            w.binary_name,
            w.timestamp,
            w.action.as_str(),
            to_json_text(&w.hosts)?,
            w.slots.current.exists,
            w.slots.new.exists,
            w.slots.old.exists,
            w.git_tag,
        ],
    )?;
    Ok(changed > 0)
}

pub fn append_release_history(tx: &Transaction<'_>, w: &ReleaseWrite) -> rusqlite::Result<i64> {
    tx.execute(
        "INSERT INTO release_history (
             binary_name, timestamp, action, hosts, source_size, source_path, operation, git_tag,
             ingested_from
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            w.binary_name,
            w.timestamp,
            w.action.as_str(),
            to_json_text(&w.hosts)?,
            w.details.source_size,
            w.details.source_path,
            w.details.operation,
            w.git_tag,
            w.ingested_from,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Latest-ingested wins for the playbook snapshot.
pub fn upsert_playbook_snapshot(tx: &Transaction<'_>, w: &PlaybookWrite) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO playbooks (playbook_name, timestamp, status, hosts, details)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(playbook_name) DO UPDATE SET
             timestamp = excluded.timestamp,
             status = excluded.status,
             hosts = excluded.hosts,
             details = excluded.details",
        params![
            w.playbook_name,
            w.timestamp,
            w.status,
            to_json_text(&w.hosts)?,
            to_json_text(&w.details)?,
        ],
    )?;
    Ok(())
}

pub fn append_playbook_history(tx: &Transaction<'_>, w: &PlaybookWrite) -> rusqlite::Result<i64> {
    tx.execute(
        "INSERT INTO playbook_history (
             playbook_name, timestamp, status, hosts, details, ingested_from
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            w.playbook_name,
            w.timestamp,
            w.status,
            to_json_text(&w.hosts)?,
            to_json_text(&w.details)?,
            w.ingested_from,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Ledger row for a file. Fails on a repeated (path, hash) pair.
pub fn record_ingested_file(
    tx: &Transaction<'_>,
    key: &LedgerKey,
    kind: FileKind,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO file_hashes (file_path, file_hash, kind) VALUES (?1, ?2, ?3)",
        params![key.path, key.hash.as_str(), kind.as_str()],
    )?;
    Ok(())
}

pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollcall::ledger::ContentHash;
    use crate::rollcall::payload::SlotState;

    fn release(binary: &str, ts: &str, action: ReleaseAction) -> ReleaseWrite {
        ReleaseWrite {
            binary_name: binary.to_string(),
            timestamp: ts.to_string(),
            action,
            hosts: vec!["h1".to_string(), "h2".to_string()],
            slots: SlotStates {
                current: SlotState { exists: true },
                ..SlotStates::default()
            },
            git_tag: Some("v1".to_string()),
            details: ReleaseDetails::default(),
            ingested_from: format!("/releases/{binary}_{ts}.json"),
        }
    }

    fn apply(store: &mut Store, w: &ReleaseWrite) -> bool {
        store
            .write(|tx| {
                let advanced = upsert_release_snapshot(tx, w)?;
                append_release_history(tx, w)?;
                Ok::<_, rusqlite::Error>(advanced)
            })
            .expect("write release")
    }

    #[test]
    fn empty_hosts_and_missing_tag_preserve_stored_values() {
        let mut store = Store::open_in_memory().expect("store");
        apply(&mut store, &release("agent", "2024-01-01T00:00:00.000000Z", ReleaseAction::Release));

        let mut later = release("agent", "2024-01-01T00:01:00.000000Z", ReleaseAction::Promote);
        later.hosts.clear();
        later.git_tag = None;
        apply(&mut store, &later);

        let snap = store.release("agent").expect("query").expect("row");
        assert_eq!(snap.hosts, vec!["h1", "h2"]);
        assert_eq!(snap.git_tag.as_deref(), Some("v1"));
        assert_eq!(snap.last_action, "promote");
        assert_eq!(snap.last_updated, "2024-01-01T00:01:00.000000Z");
    }

    #[test]
    fn older_event_appends_history_without_moving_snapshot() {
        let mut store = Store::open_in_memory().expect("store");
        let newer = release("agent", "2024-01-01T00:01:00.000000Z", ReleaseAction::Promote);
        let older = release("agent", "2024-01-01T00:00:00.000000Z", ReleaseAction::Release);

        assert!(apply(&mut store, &newer));
        assert!(!apply(&mut store, &older));

        let snap = store.release("agent").expect("query").expect("row");
        assert_eq!(snap.last_updated, newer.timestamp);
        assert_eq!(snap.last_action, "promote");

        let history = store.release_history("agent", 10).expect("history");
        let stamps: Vec<_> = history.iter().map(|h| h.timestamp.as_str()).collect();
        assert_eq!(stamps, vec![newer.timestamp.as_str(), older.timestamp.as_str()]);
    }

    #[test]
    fn failed_closure_rolls_back_snapshot_and_history() {
        let mut store = Store::open_in_memory().expect("store");
        let w = release("agent", "2024-01-01T00:00:00.000000Z", ReleaseAction::Release);

        let result: Result<(), anyhow::Error> = store.write(|tx| {
            upsert_release_snapshot(tx, &w)?;
            Err(anyhow!("simulated failure before history append"))
        });
        assert!(result.is_err());

        assert_eq!(store.counts().expect("counts"), StoreCounts::default());
    }

    #[test]
    fn history_rejects_update_and_delete() {
        let mut store = Store::open_in_memory().expect("store");
        apply(&mut store, &release("agent", "2024-01-01T00:00:00.000000Z", ReleaseAction::Release));

        let update = store.write(|tx| tx.execute("UPDATE release_history SET action = 'rollback'", []));
        assert!(update.is_err());
        let delete = store.write(|tx| tx.execute("DELETE FROM release_history", []));
        assert!(delete.is_err());
        assert_eq!(store.counts().expect("counts").release_history, 1);
    }

    #[test]
    fn ledger_pair_is_unique() {
        let mut store = Store::open_in_memory().expect("store");
        let key = LedgerKey {
            path: "/releases/a.json".to_string(),
            hash: ContentHash::of_bytes(b"{}"),
        };
        store
            .write(|tx| record_ingested_file(tx, &key, FileKind::Release))
            .expect("first insert");
        assert!(store.ledger_contains(&key).expect("lookup"));

        let err = store
            .write(|tx| record_ingested_file(tx, &key, FileKind::Release))
            .expect_err("duplicate");
        assert!(is_unique_violation(&err));

        let other_path = LedgerKey {
            path: "/releases/b.json".to_string(),
            hash: key.hash.clone(),
        };
        assert!(!store.ledger_contains(&other_path).expect("lookup"));
    }

    #[test]
    fn playbook_snapshot_tracks_latest_ingested_and_keeps_history() {
        let mut store = Store::open_in_memory().expect("store");
        let first = PlaybookWrite {
            playbook_name: "site".to_string(),
            timestamp: "2024-01-02T00:00:00.000000Z".to_string(),
            status: "failed".to_string(),
            hosts: vec!["h1".to_string()],
            details: serde_json::json!([{"task": "x"}]),
            ingested_from: "/status/site_playbook_1.json".to_string(),
        };
        let second = PlaybookWrite {
            timestamp: "2024-01-01T00:00:00.000000Z".to_string(),
            status: "ok".to_string(),
            ingested_from: "/status/site_playbook_2.json".to_string(),
            ..first.clone()
        };
        for w in [&first, &second] {
            store
                .write(|tx| {
                    upsert_playbook_snapshot(tx, w)?;
                    append_playbook_history(tx, w)
                })
                .expect("write playbook");
        }

        let snap = store.playbook("site").expect("query").expect("row");
        assert_eq!(snap.status, "ok");
        assert_eq!(snap.details, serde_json::json!([{"task": "x"}]));
        assert_eq!(store.playbook_history("site", 10).expect("history").len(), 2);
    }

    #[test]
    fn read_only_handle_sees_committed_rows() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let db = tmp.path().join("db/dashboard.db");
        let mut store = Store::open(&db).expect("open");
        apply(&mut store, &release("agent", "2024-01-01T00:00:00.000000Z", ReleaseAction::Release));

        let mut reader = Store::open_read_only(&db).expect("read only");
        assert_eq!(reader.releases().expect("releases").len(), 1);
        assert!(reader.write(|tx| tx.execute("DELETE FROM releases", [])).is_err());
    }

    #[test]
    fn read_only_open_rejects_uninitialized_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let db = tmp.path().join("empty.db");
        Connection::open(&db).expect("create empty");
        assert!(Store::open_read_only(&db).is_err());
    }
}
