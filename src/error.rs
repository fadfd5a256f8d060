//! Error types for index construction, querying and persistence

use std::io;

/// Errors produced by the index core.
///
/// Only [`Error::ReadFailed`] is recoverable during a build: the offending
/// file is logged and left out of the index. Every other variant propagates
/// to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to list files: {0}")]
    ListingFailed(#[source] Box<Error>),

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode index payload: {0}")]
    Encode(#[source] bincode::Error),

    #[error("Failed to decode index payload: {0}")]
    Decode(#[source] bincode::Error),

    #[error("Record length mismatch: declared {expected} bytes, read {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an I/O error from reading `path`, mapping `NotFound` onto
    /// [`Error::NotFound`].
    pub fn read(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Error::NotFound(path)
        } else {
            Error::ReadFailed { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
