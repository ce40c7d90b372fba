use crate::rollcall::engine::Ingestor;
use crate::rollcall::reconcile;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::{Duration, SystemTime};

const SHUTDOWN_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMessage {
    FileCreated(PathBuf),
    Rescan,
    Shutdown,
}

/// Bounded FIFO between the watcher thread and the single ingestion consumer.
pub fn channel(capacity: usize) -> (SyncSender<QueueMessage>, Receiver<QueueMessage>) {
    mpsc::sync_channel(capacity.max(1))
}

/// Set once by the signal handler; checked by the consumer between files.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub settle: Duration,
    pub dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub exit: LoopExit,
    pub files: u64,
    pub rescans: u64,
}

/// Wait out the remainder of the settle window if the file was touched very recently.
fn settle_wait(path: &Path, settle: Duration, now: SystemTime) -> Option<Duration> {
    if settle.is_zero() {
        return None;
    }
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let age = now.duration_since(modified).unwrap_or_default();
    settle.checked_sub(age).filter(|d| !d.is_zero())
}

/// Consume the queue until Shutdown arrives, the signal fires, or every sender is gone.
///
/// Each message is handled to completion before the next is taken, so a shutdown
/// never interrupts an open transaction.
pub fn run_loop(
    rx: &Receiver<QueueMessage>,
    ingestor: &mut Ingestor,
    settings: &LoopSettings,
    signal: &ShutdownSignal,
) -> LoopOutcome {
    let mut outcome = LoopOutcome {
        exit: LoopExit::Disconnected,
        files: 0,
        rescans: 0,
    };
    let dirs: Vec<&Path> = settings.dirs.iter().map(PathBuf::as_path).collect();

    loop {
        if signal.is_triggered() {
            outcome.exit = LoopExit::Shutdown;
            break;
        }
        let message = match rx.recv_timeout(SHUTDOWN_POLL) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match message {
            QueueMessage::FileCreated(path) => {
                if path.is_dir() {
                    tracing::debug!(path = %path.display(), "ignoring subdirectory");
                    continue;
                }
                if let Some(wait) = settle_wait(&path, settings.settle, SystemTime::now()) {
                    tracing::debug!(path = %path.display(), wait_ms = wait.as_millis() as u64, "settling");
                    thread::sleep(wait);
                }
                // Errors are already logged and counted by the ingestor.
                let _ = ingestor.process(&path);
                outcome.files += 1;
            }
            QueueMessage::Rescan => {
                tracing::info!("watch backend requested a rescan");
                match reconcile::run(&dirs, ingestor, Some(signal)) {
                    Ok(pass) => tracing::info!(
                        scanned = pass.scanned,
                        ingested = pass.ingested,
                        "rescan complete"
                    ),
                    Err(err) => tracing::warn!(error = %format!("{err:#}"), "rescan failed"),
                }
                outcome.rescans += 1;
            }
            QueueMessage::Shutdown => {
                outcome.exit = LoopExit::Shutdown;
                break;
            }
        }
    }

    tracing::info!(
        exit = ?outcome.exit,
        files = outcome.files,
        rescans = outcome.rescans,
        "ingestion loop stopped"
    );
    outcome
}
