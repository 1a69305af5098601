//! Driven port for the discovery cache and record input files.

use std::path::{Path, PathBuf};

use super::define_port_error;
use crate::domain::Record;

define_port_error! {
    /// Errors raised while reading or writing record files.
    pub enum RecordCacheError {
        /// The file could not be opened or read.
        Read { message: String } =>
            "record file unreadable: {message}",
        /// A line in the file is not a JSON object.
        Malformed { message: String } =>
            "record file malformed: {message}",
        /// The file could not be written or removed.
        Write { message: String } =>
            "record file write failed: {message}",
    }
}

/// Port over the discovery cache written by a fresh discovery and over
/// record files supplied as input.
#[cfg_attr(test, mockall::automock)]
pub trait RecordCache: Send + Sync {
    /// Absolute location of the discovery cache.
    fn discovery_cache_path(&self) -> PathBuf;

    /// Whether a discovery cache from an earlier run is present.
    fn discovery_cache_exists(&self) -> bool;

    /// Delete the discovery cache, returning whether one was removed.
    fn clear_discovery_cache(&self) -> Result<bool, RecordCacheError>;

    /// Append one discovered record to the discovery cache.
    fn append_to_discovery_cache(&self, record: &Record) -> Result<(), RecordCacheError>;

    /// Load every record from the record file at `path`.
    ///
    /// A single malformed line fails the whole load.
    fn load(&self, path: &Path) -> Result<Vec<Record>, RecordCacheError>;
}
