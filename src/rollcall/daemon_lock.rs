use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPayload {
    pub pid: u32,
    pub build_uuid: String,
    pub start_time: String,
}

impl LockPayload {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            build_uuid: env!("BUILD_UUID").to_string(),
            start_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Exclusive hold on the writer lock file. Released and removed on drop.
#[derive(Debug)]
pub struct DaemonLock {
    file: File,
    path: PathBuf,
    payload: LockPayload,
}

#[derive(Debug)]
pub enum LockAttempt {
    Acquired(DaemonLock),
    Held { holder: Option<LockPayload> },
}

impl DaemonLock {
    pub fn acquire(path: &Path) -> Result<LockAttempt> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        if let Err(err) = file.try_lock_exclusive() {
            if err.kind() == io::ErrorKind::WouldBlock
                || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
            {
                return Ok(LockAttempt::Held {
                    holder: read_lock_payload(path).ok(),
                });
            }
            return Err(err).with_context(|| format!("failed to lock {}", path.display()));
        }

        let payload = LockPayload::current();
        file.set_len(0)?;
        file.write_all(serde_json::to_string(&payload)?.as_bytes())?;
        file.sync_all()?;

        Ok(LockAttempt::Acquired(Self {
            file,
            path: path.to_path_buf(),
            payload,
        }))
    }

    pub fn payload(&self) -> &LockPayload {
        &self.payload
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn read_lock_payload(path: &Path) -> Result<LockPayload> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid daemon lock {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_is_refused_until_release() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("logs/rollcall.lock");

        let LockAttempt::Acquired(first) = DaemonLock::acquire(&path).expect("first") else {
            panic!("first acquire should succeed");
        };
        let on_disk = read_lock_payload(&path).expect("payload");
        assert_eq!(on_disk.pid, std::process::id());
        assert_eq!(&on_disk, first.payload());

        match DaemonLock::acquire(&path).expect("second") {
            LockAttempt::Held { holder } => assert_eq!(holder, Some(on_disk)),
            LockAttempt::Acquired(_) => panic!("lock must be exclusive"),
        }

        drop(first);
        assert!(!path.exists());
        assert!(matches!(
            DaemonLock::acquire(&path).expect("third"),
            LockAttempt::Acquired(_)
        ));
    }
}
