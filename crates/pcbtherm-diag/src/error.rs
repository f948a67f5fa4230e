//! Error types for diagnostics.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing or reading diagnostic files.
#[derive(Debug, Error)]
pub enum DiagError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A Matrix-Market file could not be parsed.
    #[error("Matrix-Market parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A dump needs the dense shadow, which was not captured.
    #[error("dense shadow not available for a system of size {size}")]
    ShadowUnavailable { size: usize },

    /// Vector or matrix dimensions disagree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl DiagError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type for diagnostics.
pub type Result<T> = std::result::Result<T, DiagError>;
