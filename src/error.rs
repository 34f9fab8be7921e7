//! Error kinds shared by every archive operation.
//!
//! The distinction between `NotFound` and `Io` matters during directory
//! enumeration (§4.4): enumeration stops silently on the former and is
//! reported on the latter.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("read past end of {path}: offset {offset} + length {length} > size {size}")]
    Truncated {
        path: PathBuf,
        offset: u64,
        length: u64,
        size: u64,
    },

    #[error("corrupt bzip2 block in {path} at offset {offset}")]
    CorruptBlock { path: PathBuf, offset: u64 },

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("data shard for file number {0} is missing")]
    MissingShard(u32),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("another geographic search is already in progress")]
    SearchInProgress,
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArchiveError::NotFound(path.into().display().to_string())
        } else {
            ArchiveError::Io {
                path: path.into(),
                source,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
