//! Error types for record and log files.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Failures raised while reading or writing line files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordStoreError {
    /// The path does not end in a file name.
    #[error("path '{path}' does not name a file")]
    InvalidPath {
        /// Offending path.
        path: Utf8PathBuf,
    },

    /// The file or its directory could not be opened, read, or written.
    #[error("I/O failure on '{path}': {message}")]
    Io {
        /// File the operation targeted.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// A record could not be serialised to JSON.
    #[error("failed to serialise record for '{path}': {message}")]
    Serialize {
        /// File the record was destined for.
        path: Utf8PathBuf,
        /// Serialiser error message.
        message: String,
    },

    /// A stored line is not a valid record.
    #[error("malformed record in '{path}' at line {line}: {message}")]
    Parse {
        /// File being read.
        path: Utf8PathBuf,
        /// 1-based line number of the malformed entry.
        line: usize,
        /// Parser error message.
        message: String,
    },
}

impl RecordStoreError {
    pub(crate) fn io(path: &Utf8Path, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}
