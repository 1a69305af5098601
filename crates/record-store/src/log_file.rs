//! Plain-text, append-only log files.

use std::io::Write;

use camino::Utf8Path;

use crate::error::RecordStoreError;
use crate::location::FileLocation;

/// An append-only text file written one message at a time.
#[derive(Debug)]
pub struct LogFile {
    location: FileLocation,
}

impl LogFile {
    /// Bind to the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidPath`] when `path` has no file name
    /// and [`RecordStoreError::Io`] when the parent directory cannot be opened.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, RecordStoreError> {
        Ok(Self {
            location: FileLocation::open(path.as_ref())?,
        })
    }

    /// Path the file was opened with.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.location.path()
    }

    /// Delete the file, returning whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Io`] when an existing file cannot be deleted.
    pub fn remove(&self) -> Result<bool, RecordStoreError> {
        self.location.remove()
    }

    /// Append `message` followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Io`] when the write fails.
    pub fn append_line(&self, message: &str) -> Result<(), RecordStoreError> {
        let mut file = self.location.open_append()?;
        let mut entry = String::with_capacity(message.len() + 1);
        entry.push_str(message);
        entry.push('\n');
        file.write_all(entry.as_bytes())
            .map_err(|error| RecordStoreError::io(self.path(), &error))
    }
}
