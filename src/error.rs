//! Errors raised while building or loading collision masks.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for mask construction and persistence.
pub type MaskResult<T> = Result<T, MaskError>;

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("mask I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed mask {path} (line {line}): {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl MaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MaskError::Io { path: path.into(), source }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        MaskError::Parse { path: path.into(), line, reason: reason.into() }
    }
}
