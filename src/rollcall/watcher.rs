use crate::error::DaemonErrorCode;
use crate::rollcall::audit;
use crate::rollcall::config::RollcallConfig;
use crate::rollcall::daemon_lock::{DaemonLock, LockAttempt};
use crate::rollcall::engine::{IngestStats, Ingestor};
use crate::rollcall::paths::RollcallPaths;
use crate::rollcall::queue::{self, LoopOutcome, LoopSettings, QueueMessage, ShutdownSignal};
use crate::rollcall::reconcile::{self, ReconcileOutcome};
use crate::rollcall::store::Store;
use anyhow::{Context, Result, anyhow};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::SyncSender;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OnceOutcome {
    pub reconcile: ReconcileOutcome,
    pub stats: IngestStats,
}

#[derive(Debug, Clone)]
pub struct DaemonOutcome {
    pub watched: Vec<PathBuf>,
    pub startup: ReconcileOutcome,
    pub queue: LoopOutcome,
    pub stats: IngestStats,
}

/// Paths that became visible as new files in a watched directory.
///
/// Producers usually write a temp file and rename it into place, so the
/// destination of a rename counts the same as a create.
pub fn created_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::File | CreateKind::Any | CreateKind::Other) => {
            event.paths.clone()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        // FSEvents and kqueue report renames without a direction; keep whichever side exists.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any | RenameMode::Other)) => event
            .paths
            .iter()
            .filter(|p| p.is_file())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

/// Non-recursive watch over the existing input directories.
pub struct DirectoryWatcher {
    _inner: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl DirectoryWatcher {
    pub fn start(dirs: &[&Path], tx: SyncSender<QueueMessage>) -> Result<Self> {
        let mut inner = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event.need_rescan() {
                    let _ = tx.send(QueueMessage::Rescan);
                }
                for path in created_paths(&event) {
                    tracing::debug!(path = %path.display(), "file event");
                    if tx.send(QueueMessage::FileCreated(path)).is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "watch backend error; scheduling rescan");
                let _ = tx.send(QueueMessage::Rescan);
            }
        })
        .context("failed to create filesystem watcher")?;

        let mut watched = Vec::new();
        for dir in dirs {
            if !dir.is_dir() {
                tracing::warn!(dir = %dir.display(), "watch directory missing; not watching");
                continue;
            }
            inner
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("failed to watch {}", dir.display()))?;
            tracing::info!(dir = %dir.display(), "watching");
            watched.push(dir.to_path_buf());
        }

        Ok(Self {
            _inner: inner,
            watched,
        })
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

fn acquire_lock(paths: &RollcallPaths) -> Result<DaemonLock> {
    let lock_path = paths.daemon_lock();
    match DaemonLock::acquire(&lock_path)? {
        LockAttempt::Acquired(lock) => Ok(lock),
        LockAttempt::Held { holder } => Err(anyhow!(
            "{}: another rollcall writer holds {} (pid={})",
            DaemonErrorCode::E001Locked.as_str(),
            lock_path.display(),
            holder.map_or_else(|| "unknown".to_string(), |h| h.pid.to_string())
        )),
    }
}

/// Take the writer lock and open the store. Used by every command that writes.
pub fn open_writer(paths: &RollcallPaths, cfg: &RollcallConfig) -> Result<(DaemonLock, Ingestor)> {
    let lock = acquire_lock(paths)?;
    let store = Store::open(&cfg.store.db_path).with_context(|| {
        format!(
            "{}: cannot open store {}",
            DaemonErrorCode::E004StoreOpen.as_str(),
            cfg.store.db_path.display()
        )
    })?;
    let ingestor = Ingestor::new(store, cfg).with_audit_log(paths.audit_log());
    Ok((lock, ingestor))
}

fn audit_reconcile(paths: &RollcallPaths, phase: &str, out: &ReconcileOutcome) {
    audit::record(
        Some(&paths.audit_log()),
        phase,
        if out.failed == 0 { "ok" } else { "degraded" },
        &format!(
            "scanned={} ingested={} duplicates={} skipped={} failed={} missing_dirs={}",
            out.scanned,
            out.ingested,
            out.duplicates,
            out.skipped,
            out.failed,
            out.missing_dirs.join(",")
        ),
    );
}

/// One reconcile pass over both directories, then exit.
pub fn run_once(paths: &RollcallPaths, cfg: &RollcallConfig) -> Result<OnceOutcome> {
    let (lock, mut ingestor) = open_writer(paths, cfg)?;
    let out = reconcile::run(&cfg.watch_dirs(), &mut ingestor, None)?;
    audit_reconcile(paths, "reconcile", &out);
    tracing::info!(stats = %ingestor.stats().summary(), "pass complete");
    drop(lock);
    Ok(OnceOutcome {
        reconcile: out,
        stats: ingestor.stats().clone(),
    })
}

/// Long-running mode: watch, catch up, then consume events until interrupted.
pub fn run_daemon(paths: &RollcallPaths, cfg: &RollcallConfig) -> Result<DaemonOutcome> {
    let (lock, mut ingestor) = open_writer(paths, cfg)?;
    let audit_log = paths.audit_log();
    audit::record(
        Some(&audit_log),
        "daemon",
        "started",
        &format!("pid={} build={}", lock.payload().pid, lock.payload().build_uuid),
    );

    let (tx, rx) = queue::channel(cfg.watch.queue_capacity);
    let signal = ShutdownSignal::default();
    {
        let signal = signal.clone();
        let tx = tx.clone();
        ctrlc::set_handler(move || {
            tracing::info!("shutdown requested");
            signal.trigger();
            let _ = tx.try_send(QueueMessage::Shutdown);
        })
        .context("failed to install signal handler")?;
    }

    // Watch first so nothing created during the startup scan is missed.
    let watcher = DirectoryWatcher::start(&cfg.watch_dirs(), tx)?;
    let startup = reconcile::run(&cfg.watch_dirs(), &mut ingestor, Some(&signal))?;
    audit_reconcile(paths, "reconcile", &startup);
    tracing::info!(stats = %ingestor.stats().summary(), "startup reconcile complete");

    let settings = LoopSettings {
        settle: Duration::from_millis(cfg.watch.settle_ms),
        dirs: cfg.watch_dirs().iter().map(|d| d.to_path_buf()).collect(),
    };
    let outcome = queue::run_loop(&rx, &mut ingestor, &settings, &signal);
    let watched = watcher.watched().to_vec();
    drop(watcher);

    let stats = ingestor.stats().clone();
    tracing::info!(stats = %stats.summary(), "daemon stopping");
    audit::record(Some(&audit_log), "daemon", "stopped", &stats.summary());
    drop(lock);

    Ok(DaemonOutcome {
        watched,
        startup,
        queue: outcome,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollcall::engine::tests::test_config;
    use notify::event::{DataChange, Flag};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn creates_and_rename_targets_count_as_new_files() {
        let create = event(EventKind::Create(CreateKind::File), &["/r/a_release.json"]);
        assert_eq!(created_paths(&create), vec![PathBuf::from("/r/a_release.json")]);

        let rename = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/r/.a.tmp", "/r/a_release.json"],
        );
        assert_eq!(created_paths(&rename), vec![PathBuf::from("/r/a_release.json")]);

        let rename_to = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/r/b_release.json"],
        );
        assert_eq!(created_paths(&rename_to).len(), 1);

        let tmp = tempfile::tempdir().expect("tempdir");
        let landed = tmp.path().join("c_release.json");
        std::fs::write(&landed, "{}").expect("write");
        let gone = tmp.path().join(".c.tmp");
        let undirected = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(gone.clone())
            .add_path(landed.clone());
        assert_eq!(created_paths(&undirected), vec![landed.clone()]);

        let other = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Other)))
            .add_path(landed.clone());
        assert_eq!(created_paths(&other), vec![landed]);

        let moved_away =
            Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any))).add_path(gone);
        assert!(created_paths(&moved_away).is_empty());
    }

    #[test]
    fn writes_and_removals_are_ignored() {
        let write = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/r/a_release.json"],
        );
        assert!(created_paths(&write).is_empty());
        let rename_from = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/r/a_release.json"],
        );
        assert!(created_paths(&rename_from).is_empty());
        let removed = event(
            EventKind::Remove(notify::event::RemoveKind::File),
            &["/r/a_release.json"],
        );
        assert!(created_paths(&removed).is_empty());
        let dir = event(EventKind::Create(CreateKind::Folder), &["/r/sub"]);
        assert!(created_paths(&dir).is_empty());
    }

    #[test]
    fn rescan_flag_is_visible_on_events() {
        let flagged = event(EventKind::Other, &[]).set_flag(Flag::Rescan);
        assert!(flagged.need_rescan());
        assert!(created_paths(&flagged).is_empty());
    }

    #[test]
    fn second_writer_is_refused_with_lock_code() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cfg = test_config(tmp.path());
        let paths = RollcallPaths {
            rollcall_home: tmp.path().to_path_buf(),
            logs_dir: tmp.path().join("logs"),
            default_db_file: cfg.store.db_path.clone(),
            default_status_dir: cfg.watch.playbooks_dir.clone(),
            default_release_dir: cfg.watch.releases_dir.clone(),
        };

        let (_lock, _ingestor) = open_writer(&paths, &cfg).expect("first writer");
        let err = run_once(&paths, &cfg).err().expect("second writer refused");
        assert!(format!("{err:#}").contains("E001_LOCKED"));
    }

    #[test]
    fn live_watcher_skips_missing_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let present = tmp.path().join("releases");
        std::fs::create_dir_all(&present).expect("mkdir");
        let missing = tmp.path().join("status");

        let (tx, _rx) = queue::channel(4);
        let watcher = DirectoryWatcher::start(&[missing.as_path(), present.as_path()], tx)
            .expect("watcher");
        assert_eq!(watcher.watched(), &[present]);
    }
}
