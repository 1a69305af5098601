//! `ImportJournal` adapter writing per-kind log and retry files.

use std::path::PathBuf;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use record_store::{LogFile, RecordFile, RecordStoreError};

use crate::domain::ports::{ImportJournal, ImportJournalError, JournalLocations};
use crate::domain::{ObjectKind, Record};

/// Journal writing `<kind>_import.log` and `<kind>_retry_cache` under a base
/// directory.
///
/// Appends from concurrent workers are serialised by one lock held only for
/// the duration of the write.
#[derive(Debug)]
pub struct FileImportJournal {
    base_dir: Utf8PathBuf,
    writer: Mutex<()>,
}

impl FileImportJournal {
    /// Write journal files into `base_dir`.
    pub fn new(base_dir: impl AsRef<Utf8Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            writer: Mutex::new(()),
        }
    }

    fn log_path(&self, kind: ObjectKind) -> Utf8PathBuf {
        self.base_dir.join(format!("{kind}_import.log"))
    }

    fn retry_cache_path(&self, kind: ObjectKind) -> Utf8PathBuf {
        self.base_dir.join(format!("{kind}_retry_cache"))
    }

    fn exclusive<T>(
        &self,
        write: impl FnOnce() -> Result<T, ImportJournalError>,
    ) -> Result<T, ImportJournalError> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| ImportJournalError::write("journal lock poisoned"))?;
        write()
    }
}

impl ImportJournal for FileImportJournal {
    fn begin_pass(&self, kind: ObjectKind) -> Result<JournalLocations, ImportJournalError> {
        let log = self.log_path(kind);
        let retry_cache = self.retry_cache_path(kind);
        let reset = |error: RecordStoreError| ImportJournalError::reset(error.to_string());

        self.exclusive(|| {
            let removed_previous_log = LogFile::open(&log)
                .and_then(|file| file.remove())
                .map_err(reset)?;
            let removed_previous_retry_cache = RecordFile::open(&retry_cache)
                .and_then(|file| file.remove())
                .map_err(reset)?;
            Ok(JournalLocations {
                log: PathBuf::from(log.as_std_path()),
                retry_cache: PathBuf::from(retry_cache.as_std_path()),
                removed_previous_log,
                removed_previous_retry_cache,
            })
        })
    }

    fn log(&self, kind: ObjectKind, message: &str) -> Result<(), ImportJournalError> {
        let path = self.log_path(kind);
        self.exclusive(|| {
            LogFile::open(&path)
                .and_then(|file| file.append_line(message))
                .map_err(|error| ImportJournalError::write(error.to_string()))
        })
    }

    fn queue_retry(&self, kind: ObjectKind, record: &Record) -> Result<(), ImportJournalError> {
        let path = self.retry_cache_path(kind);
        self.exclusive(|| {
            RecordFile::open(&path)
                .and_then(|file| file.append(record))
                .map_err(|error| ImportJournalError::write(error.to_string()))
        })
    }
}
