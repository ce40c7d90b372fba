use crate::error::IngestError;
use crate::rollcall::audit;
use crate::rollcall::classify::{Classification, FileKind, classify_path};
use crate::rollcall::config::RollcallConfig;
use crate::rollcall::ledger::{self, LedgerKey};
use crate::rollcall::payload::{PlaybookStatus, ReleaseEvent};
use crate::rollcall::store::{self, PlaybookWrite, ReleaseWrite, Store};
use crate::rollcall::timestamp::{self, FilenameParse};
use chrono_tz::Tz;
use rusqlite::Transaction;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested {
        kind: FileKind,
        entity: String,
        snapshot_advanced: bool,
    },
    Duplicate {
        kind: FileKind,
    },
    Skipped(Classification),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub ingested_playbooks: u64,
    pub ingested_releases: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub failed: BTreeMap<&'static str, u64>,
}

impl IngestStats {
    fn record(&mut self, result: &Result<IngestOutcome, IngestError>) {
        match result {
            Ok(IngestOutcome::Ingested { kind, .. }) => match kind {
                FileKind::Playbook => self.ingested_playbooks += 1,
                FileKind::Release => self.ingested_releases += 1,
            },
            Ok(IngestOutcome::Duplicate { .. }) => self.duplicates += 1,
            Ok(IngestOutcome::Skipped(_)) => self.skipped += 1,
            Err(err) => *self.failed.entry(err.code().as_str()).or_default() += 1,
        }
    }

    pub fn failed_total(&self) -> u64 {
        self.failed.values().sum()
    }

    #[cfg(test)]
    pub fn failed_for(&self, code: crate::error::IngestErrorCode) -> u64 {
        self.failed.get(code.as_str()).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        let failed = self
            .failed
            .iter()
            .map(|(code, n)| format!("{code}:{n}"))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "ingested_playbooks={} ingested_releases={} duplicates={} skipped={} failed={} failed_by_code=[{}]",
            self.ingested_playbooks,
            self.ingested_releases,
            self.duplicates,
            self.skipped,
            self.failed_total(),
            failed
        )
    }
}

/// The single write path into the store.
///
/// One `Ingestor` owns the writable [`Store`]; callers feed it files one at a time
/// from the startup scan or the live queue.
pub struct Ingestor {
    store: Store,
    filename_tz: Tz,
    ignore_suffixes: Vec<String>,
    audit_log: Option<PathBuf>,
    stats: IngestStats,
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or_default()
}

impl Ingestor {
    pub fn new(store: Store, cfg: &RollcallConfig) -> Self {
        Self {
            store,
            filename_tz: cfg.filename_timezone(),
            ignore_suffixes: cfg.watch.ignore_suffixes.clone(),
            audit_log: None,
            stats: IngestStats::default(),
        }
    }

    pub fn with_audit_log(mut self, path: PathBuf) -> Self {
        self.audit_log = Some(path);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Attempt one file. Failures are logged and counted, never propagated further.
    pub fn process(&mut self, path: &Path) -> Result<IngestOutcome, IngestError> {
        let result = self.ingest_path(path);
        self.stats.record(&result);

        match &result {
            Ok(IngestOutcome::Ingested {
                kind,
                entity,
                snapshot_advanced,
            }) => tracing::info!(
                path = %path.display(),
                kind = kind.as_str(),
                entity = %entity,
                snapshot_advanced,
                "ingested"
            ),
            Ok(IngestOutcome::Duplicate { kind }) => tracing::debug!(
                path = %path.display(),
                kind = kind.as_str(),
                "already ingested"
            ),
            Ok(IngestOutcome::Skipped(reason)) => tracing::info!(
                path = %path.display(),
                reason = ?reason,
                "skipped"
            ),
            Err(err) => {
                tracing::warn!(
                    path = %err.path().display(),
                    code = err.code().as_str(),
                    error = %err,
                    "ingestion failed; file stays eligible for retry"
                );
                audit::record(
                    self.audit_log.as_deref(),
                    "ingest",
                    "failed",
                    &format!("code={} path={} error={err}", err.code().as_str(), path.display()),
                );
            }
        }
        result
    }

    fn ingest_path(&mut self, path: &Path) -> Result<IngestOutcome, IngestError> {
        let kind = match classify_path(path, &self.ignore_suffixes) {
            Classification::Ingest(kind) => kind,
            other => return Ok(IngestOutcome::Skipped(other)),
        };

        let (bytes, key) = ledger::read_and_key(path).map_err(|source| IngestError::TransientIo {
            path: path.to_path_buf(),
            source,
        })?;

        let seen = self
            .store
            .ledger_contains(&key)
            .map_err(|source| IngestError::Store {
                path: path.to_path_buf(),
                source,
            })?;
        if seen {
            return Ok(IngestOutcome::Duplicate { kind });
        }

        self.apply(kind, path, &bytes, &key)
    }

    /// Parse and persist bytes already known to be absent from the ledger.
    fn apply(
        &mut self,
        kind: FileKind,
        path: &Path,
        bytes: &[u8],
        key: &LedgerKey,
    ) -> Result<IngestOutcome, IngestError> {
        match kind {
            FileKind::Release => {
                let write = self.release_write(path, bytes, key)?;
                let entity = write.binary_name.clone();
                let advanced = self.commit(kind, path, key, |tx| {
                    let advanced = store::upsert_release_snapshot(tx, &write)?;
                    store::append_release_history(tx, &write)?;
                    Ok(advanced)
                })?;
                Ok(match advanced {
                    Some(snapshot_advanced) => IngestOutcome::Ingested {
                        kind,
                        entity,
                        snapshot_advanced,
                    },
                    None => IngestOutcome::Duplicate { kind },
                })
            }
            FileKind::Playbook => {
                let write = self.playbook_write(path, bytes, key)?;
                let entity = write.playbook_name.clone();
                let committed = self.commit(kind, path, key, |tx| {
                    store::upsert_playbook_snapshot(tx, &write)?;
                    store::append_playbook_history(tx, &write)?;
                    Ok(())
                })?;
                Ok(match committed {
                    Some(()) => IngestOutcome::Ingested {
                        kind,
                        entity,
                        snapshot_advanced: true,
                    },
                    None => IngestOutcome::Duplicate { kind },
                })
            }
        }
    }

    /// Domain writes plus the ledger row in one transaction. The ledger insert is
    /// the last statement, so it is only ever visible together with its data.
    /// `None` means another writer already recorded this (path, hash).
    fn commit<T>(
        &mut self,
        kind: FileKind,
        path: &Path,
        key: &LedgerKey,
        writes: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, IngestError> {
        let result = self.store.write(|tx| {
            let out = writes(tx)?;
            store::record_ingested_file(tx, key, kind)?;
            Ok::<_, rusqlite::Error>(out)
        });
        match result {
            Ok(out) => Ok(Some(out)),
            Err(err) if store::is_unique_violation(&err) => {
                tracing::debug!(path = %path.display(), hash = %key.hash, "ledger race lost; rolled back");
                Ok(None)
            }
            Err(source) => Err(IngestError::Store {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn release_write(
        &self,
        path: &Path,
        bytes: &[u8],
        key: &LedgerKey,
    ) -> Result<ReleaseWrite, IngestError> {
        let valid = ReleaseEvent::from_slice(bytes)
            .and_then(ReleaseEvent::validate)
            .map_err(|reason| IngestError::MalformedPayload {
                path: path.to_path_buf(),
                reason,
            })?;

        let name = file_name(path);
        let filename_at = match timestamp::parse_release_filename(name, self.filename_tz) {
            FilenameParse::Parsed(stamp) => {
                if stamp.binary != valid.binary_name || stamp.action != valid.action {
                    tracing::warn!(
                        path = %path.display(),
                        filename_binary = %stamp.binary,
                        filename_action = stamp.action.as_str(),
                        payload_binary = %valid.binary_name,
                        payload_action = valid.action.as_str(),
                        "filename identity disagrees with payload; payload wins"
                    );
                }
                Some(stamp.at)
            }
            FilenameParse::NotMatched => {
                tracing::debug!(path = %path.display(), "no timestamp pattern in filename");
                None
            }
        };

        let (at, source) = timestamp::resolve(filename_at, valid.timestamp.as_deref())
            .map_err(|reason| IngestError::Timestamp {
                path: path.to_path_buf(),
                reason,
            })?;
        tracing::debug!(path = %path.display(), ?source, "release time resolved");

        Ok(ReleaseWrite {
            binary_name: valid.binary_name,
            timestamp: timestamp::format_stored(at),
            action: valid.action,
            hosts: valid.hosts,
            slots: valid.slots,
            git_tag: valid.git_tag,
            details: valid.details,
            ingested_from: key.path.clone(),
        })
    }

    fn playbook_write(
        &self,
        path: &Path,
        bytes: &[u8],
        key: &LedgerKey,
    ) -> Result<PlaybookWrite, IngestError> {
        let valid = PlaybookStatus::from_slice(bytes)
            .and_then(PlaybookStatus::validate)
            .map_err(|reason| IngestError::MalformedPayload {
                path: path.to_path_buf(),
                reason,
            })?;
        let (at, source) = timestamp::resolve(None, Some(&valid.timestamp)).map_err(|reason| {
            IngestError::Timestamp {
                path: path.to_path_buf(),
                reason,
            }
        })?;
        tracing::debug!(path = %path.display(), ?source, "playbook time resolved");

        Ok(PlaybookWrite {
            playbook_name: valid.playbook,
            timestamp: timestamp::format_stored(at),
            status: valid.status,
            hosts: valid.hosts,
            details: valid.details,
            ingested_from: key.path.clone(),
        })
    }
}
