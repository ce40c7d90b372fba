use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// SHA-256 of a file's full byte stream, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger identity of one observed file: where it was seen and what it contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerKey {
    pub path: String,
    pub hash: ContentHash,
}

/// Stable ledger path for a file: canonical parent directory plus the file name.
///
/// Live events and directory scans can name the same file differently (relative
/// config paths, symlinked roots); both must land on one ledger row.
pub fn ledger_path(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Ok(fs::canonicalize(parent)?.join(file_name))
}

/// Read the full file once; the same buffer is hashed and parsed.
pub fn read_and_key(path: &Path) -> io::Result<(Vec<u8>, LedgerKey)> {
    let key_path = ledger_path(path)?;
    let bytes = fs::read(path)?;
    let hash = ContentHash::of_bytes(&bytes);
    Ok((
        bytes,
        LedgerKey {
            path: key_path.display().to_string(),
            hash,
        },
    ))
}
