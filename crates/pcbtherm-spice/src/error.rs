//! Error types for the external circuit backend.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running the external circuit simulator.
#[derive(Debug, Error)]
pub enum SpiceError {
    /// The simulator program could not be started.
    #[error("failed to start simulator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The simulator exited unsuccessfully.
    #[error("simulator exited with {status}{}", .log_tail.as_deref().map(|t| format!(": {t}")).unwrap_or_default())]
    ExitStatus {
        status: String,
        log_tail: Option<String>,
    },

    /// The simulator did not finish within the configured time.
    #[error("simulator timed out after {secs} s")]
    Timeout { secs: u64 },

    /// The raw output file could not be parsed.
    #[error("malformed raw file at line {line}: {message}")]
    MalformedRaw { line: usize, message: String },

    /// A mesh node declared in the netlist is absent from the output.
    #[error("node '{0}' missing from simulator output")]
    MissingNode(String),

    /// The configuration cannot produce a usable command.
    #[error("invalid simulator configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing a simulator file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpiceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRaw {
            line,
            message: message.into(),
        }
    }
}

/// The pipeline treats every simulator failure as an unavailable backend.
impl From<SpiceError> for pcbtherm_solver::Error {
    fn from(err: SpiceError) -> Self {
        pcbtherm_solver::Error::BackendUnavailable(err.to_string())
    }
}

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, SpiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_backend_unavailable() {
        let err: pcbtherm_solver::Error = SpiceError::Timeout { secs: 3 }.into();
        assert_eq!(
            err,
            pcbtherm_solver::Error::BackendUnavailable("simulator timed out after 3 s".into())
        );
    }

    #[test]
    fn exit_status_includes_log_tail() {
        let err = SpiceError::ExitStatus {
            status: "exit status: 1".into(),
            log_tail: Some("netlist error".into()),
        };
        assert_eq!(err.to_string(), "simulator exited with exit status: 1: netlist error");
        let bare = SpiceError::ExitStatus {
            status: "exit status: 2".into(),
            log_tail: None,
        };
        assert_eq!(bare.to_string(), "simulator exited with exit status: 2");
    }
}
