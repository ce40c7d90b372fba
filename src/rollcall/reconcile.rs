use crate::rollcall::engine::{IngestOutcome, Ingestor};
use crate::rollcall::queue::ShutdownSignal;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub created: SystemTime,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileOutcome {
    pub scanned: usize,
    pub ingested: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
    pub missing_dirs: Vec<String>,
    pub interrupted: bool,
}

fn created_time(meta: &fs::Metadata) -> SystemTime {
    meta.created()
        .or_else(|_| meta.modified())
        .unwrap_or(UNIX_EPOCH)
}

/// Oldest first; equal times fall back to path order so runs are repeatable.
pub fn order_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
}

fn collect_dir(dir: &Path, out: &mut Vec<Candidate>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| name.starts_with('.'));
        if hidden {
            continue;
        }
        // Follow symlinks so the scan agrees with what a live read would see.
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        out.push(Candidate {
            path,
            created: created_time(&meta),
        });
    }
    Ok(())
}

/// Files directly inside each directory. Missing directories are reported, not fatal.
pub fn scan_candidates(dirs: &[&Path]) -> Result<(Vec<Candidate>, Vec<PathBuf>)> {
    let mut candidates = Vec::new();
    let mut missing = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "watch directory missing; skipping");
            missing.push(dir.to_path_buf());
            continue;
        }
        collect_dir(dir, &mut candidates)
            .with_context(|| format!("failed to read {}", dir.display()))?;
    }
    order_candidates(&mut candidates);
    Ok((candidates, missing))
}

/// Feed every file already present through the ingestor, oldest first.
///
/// Already-ledgered files come back as duplicates, so running this on every start
/// is safe and cheap apart from hashing.
pub fn run(
    dirs: &[&Path],
    ingestor: &mut Ingestor,
    stop: Option<&ShutdownSignal>,
) -> Result<ReconcileOutcome> {
    let (candidates, missing) = scan_candidates(dirs)?;
    let mut out = ReconcileOutcome {
        scanned: candidates.len(),
        missing_dirs: missing.iter().map(|p| p.display().to_string()).collect(),
        ..ReconcileOutcome::default()
    };

    for candidate in &candidates {
        if stop.is_some_and(ShutdownSignal::is_triggered) {
            out.interrupted = true;
            break;
        }
        match ingestor.process(&candidate.path) {
            Ok(IngestOutcome::Ingested { .. }) => out.ingested += 1,
            Ok(IngestOutcome::Duplicate { .. }) => out.duplicates += 1,
            Ok(IngestOutcome::Skipped(_)) => out.skipped += 1,
            Err(_) => out.failed += 1,
        }
    }

    tracing::info!(
        scanned = out.scanned,
        ingested = out.ingested,
        duplicates = out.duplicates,
        skipped = out.skipped,
        failed = out.failed,
        interrupted = out.interrupted,
        "reconcile pass finished"
    );
    Ok(out)
}
