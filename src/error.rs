use std::path::PathBuf;
use thiserror::Error;

/// Per-file ingestion failure. None of these stop the running process.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file unreadable {}: {source}", path.display())]
    TransientIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed payload in {}: {reason}", path.display())]
    MalformedPayload { path: PathBuf, reason: String },
    #[error("no usable timestamp for {}: {reason}", path.display())]
    Timestamp { path: PathBuf, reason: String },
    #[error("store transaction failed for {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

impl IngestError {
    pub fn code(&self) -> IngestErrorCode {
        match self {
            Self::TransientIo { .. } => IngestErrorCode::TransientIo,
            Self::MalformedPayload { .. } => IngestErrorCode::MalformedPayload,
            Self::Timestamp { .. } => IngestErrorCode::Timestamp,
            Self::Store { .. } => IngestErrorCode::StoreTransaction,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            Self::TransientIo { path, .. }
            | Self::MalformedPayload { path, .. }
            | Self::Timestamp { path, .. }
            | Self::Store { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestErrorCode {
    TransientIo,
    MalformedPayload,
    Timestamp,
    StoreTransaction,
}

impl IngestErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransientIo => "E_TRANSIENT_IO",
            Self::MalformedPayload => "E_MALFORMED_PAYLOAD",
            Self::Timestamp => "E_TIMESTAMP",
            Self::StoreTransaction => "E_STORE_TXN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonErrorCode {
    E001Locked,
    E004StoreOpen,
    E005ConfigInvalid,
}

impl DaemonErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001Locked => "E001_LOCKED",
            Self::E004StoreOpen => "E004_STORE_OPEN",
            Self::E005ConfigInvalid => "E005_CONFIG_INVALID",
        }
    }
}
