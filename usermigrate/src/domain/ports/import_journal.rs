//! Driven port for the per-kind outcome log and retry cache.

use std::path::PathBuf;

use super::define_port_error;
use crate::domain::{ObjectKind, Record};

define_port_error! {
    /// Errors raised while journaling import outcomes.
    pub enum ImportJournalError {
        /// A log line or retry entry could not be written.
        Write { message: String } =>
            "import journal write failed: {message}",
        /// Files from an earlier pass could not be removed.
        Reset { message: String } =>
            "import journal reset failed: {message}",
    }
}

/// Files written by one import pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalLocations {
    /// Human-readable outcome log.
    pub log: PathBuf,
    /// Records to feed back in with `--file-input`.
    pub retry_cache: PathBuf,
    /// Whether a log from an earlier pass was removed.
    pub removed_previous_log: bool,
    /// Whether a retry cache from an earlier pass was removed.
    pub removed_previous_retry_cache: bool,
}

/// Port for recording what happened to each record of a pass.
///
/// Implementations must serialise writes so concurrent workers never
/// interleave partial lines.
#[cfg_attr(test, mockall::automock)]
pub trait ImportJournal: Send + Sync {
    /// Remove the log and retry cache of a previous `kind` pass.
    fn begin_pass(&self, kind: ObjectKind) -> Result<JournalLocations, ImportJournalError>;

    /// Append one line to the `kind` outcome log.
    fn log(&self, kind: ObjectKind, message: &str) -> Result<(), ImportJournalError>;

    /// Append `record` to the `kind` retry cache.
    fn queue_retry(&self, kind: ObjectKind, record: &Record) -> Result<(), ImportJournalError>;
}
