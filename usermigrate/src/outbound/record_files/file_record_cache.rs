//! `RecordCache` adapter backed by JSON-lines files.

use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use record_store::{RecordFile, RecordStoreError};
use tracing::debug;

use super::DISCOVERY_CACHE_FILE;
use crate::domain::Record;
use crate::domain::ports::{RecordCache, RecordCacheError};

/// Discovery cache and input file reader rooted at a base directory.
#[derive(Debug, Clone)]
pub struct FileRecordCache {
    cache_path: Utf8PathBuf,
}

impl FileRecordCache {
    /// Keep the discovery cache in `base_dir`.
    pub fn new(base_dir: impl AsRef<Utf8Path>) -> Self {
        Self {
            cache_path: base_dir.as_ref().join(DISCOVERY_CACHE_FILE),
        }
    }

    fn cache_file(&self) -> Result<RecordFile, RecordCacheError> {
        RecordFile::open(&self.cache_path)
            .map_err(|error| RecordCacheError::write(error.to_string()))
    }
}

fn map_read_error(error: &RecordStoreError) -> RecordCacheError {
    match error {
        RecordStoreError::Parse { .. } => RecordCacheError::malformed(error.to_string()),
        RecordStoreError::Serialize { .. } => RecordCacheError::write(error.to_string()),
        RecordStoreError::InvalidPath { .. } | RecordStoreError::Io { .. } => {
            RecordCacheError::read(error.to_string())
        }
    }
}

impl RecordCache for FileRecordCache {
    fn discovery_cache_path(&self) -> PathBuf {
        self.cache_path.clone().into_std_path_buf()
    }

    fn discovery_cache_exists(&self) -> bool {
        self.cache_file().is_ok_and(|file| file.exists())
    }

    fn clear_discovery_cache(&self) -> Result<bool, RecordCacheError> {
        self.cache_file()?
            .remove()
            .map_err(|error| RecordCacheError::write(error.to_string()))
    }

    fn append_to_discovery_cache(&self, record: &Record) -> Result<(), RecordCacheError> {
        self.cache_file()?
            .append(record)
            .map_err(|error| RecordCacheError::write(error.to_string()))
    }

    fn load(&self, path: &Path) -> Result<Vec<Record>, RecordCacheError> {
        let path = Utf8Path::from_path(path).ok_or_else(|| {
            RecordCacheError::read(format!("'{}' is not valid UTF-8", path.display()))
        })?;
        let records = RecordFile::open(path)
            .and_then(|file| file.read_all::<Record>())
            .map_err(|error| map_read_error(&error))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| map_read_error(&error))?;
        debug!(path = %path, count = records.len(), "loaded record file");
        Ok(records)
    }
}
