//! Record and log file adapters over the `record-store` crate.
//!
//! All files live in one base directory, normally the working directory of
//! the run: `user_cache`, `<kind>_retry_cache`, and `<kind>_import.log`.

mod file_import_journal;
mod file_record_cache;

pub use file_import_journal::FileImportJournal;
pub use file_record_cache::FileRecordCache;

/// File name of the discovery cache.
pub const DISCOVERY_CACHE_FILE: &str = "user_cache";
