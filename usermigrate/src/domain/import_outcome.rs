//! Per-record outcomes and the tallies built from them.

use std::fmt;
use std::path::PathBuf;

use super::record::ObjectKind;

/// What happened to a single record during an import pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportOutcome {
    /// The server created the object.
    Loaded,
    /// The object already existed and was left untouched.
    Exists,
    /// The record had no usable name and was never sent.
    Skipped,
    /// The server call failed for a reason other than a conflict.
    Failed,
}

impl ImportOutcome {
    /// Whether the record belongs in the retry cache.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Skipped | Self::Failed)
    }
}

/// Outcome counters for one import pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportTally {
    /// Records created on the server.
    pub loaded: usize,
    /// Records already present on the server.
    pub exists: usize,
    /// Records without a usable name.
    pub skipped: usize,
    /// Records whose server call failed.
    pub failed: usize,
}

impl ImportTally {
    /// Count one more outcome.
    pub fn record(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Loaded => self.loaded += 1,
            ImportOutcome::Exists => self.exists += 1,
            ImportOutcome::Skipped => self.skipped += 1,
            ImportOutcome::Failed => self.failed += 1,
        }
    }

    /// Number of outcomes counted so far.
    #[must_use]
    pub const fn resolved(&self) -> usize {
        self.loaded + self.exists + self.skipped + self.failed
    }

    /// Number of records written to the retry cache.
    #[must_use]
    pub const fn retryable(&self) -> usize {
        self.skipped + self.failed
    }
}

impl FromIterator<ImportOutcome> for ImportTally {
    fn from_iter<I: IntoIterator<Item = ImportOutcome>>(outcomes: I) -> Self {
        let mut tally = Self::default();
        for outcome in outcomes {
            tally.record(outcome);
        }
        tally
    }
}

/// Result of one completed import pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Object kind imported by the pass.
    pub kind: ObjectKind,
    /// Number of records in the batch.
    pub total: usize,
    /// Outcome counters.
    pub tally: ImportTally,
    /// Where the pass wrote its outcome log.
    pub log: PathBuf,
    /// Where the pass queued records for retry.
    pub retry_cache: PathBuf,
}

impl BatchReport {
    /// Multi-line summary written to the outcome log and the console.
    ///
    /// # Examples
    /// ```
    /// use std::path::PathBuf;
    /// use usermigrate::domain::{BatchReport, ImportTally, ObjectKind};
    ///
    /// let report = BatchReport {
    ///     kind: ObjectKind::User,
    ///     total: 2,
    ///     tally: ImportTally { loaded: 2, ..ImportTally::default() },
    ///     log: PathBuf::from("/tmp/user_import.log"),
    ///     retry_cache: PathBuf::from("/tmp/user_retry_cache"),
    /// };
    /// assert_eq!(
    ///     report.summary(),
    ///     "Imported 2 out of 2 user objects. There were 0 failures."
    /// );
    /// ```
    #[must_use]
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Flags that feed this pass's retry cache back into a new run.
    ///
    /// Group retry caches need `--input-kind group`; without it their records
    /// would be read as nameless users.
    #[must_use]
    pub fn rerun_flags(&self) -> String {
        let flags = format!("--file-input {}", self.retry_cache.display());
        match self.kind {
            ObjectKind::User => flags,
            ObjectKind::Group => format!("{flags} --input-kind group"),
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind;
        let tally = &self.tally;
        write!(
            f,
            "Imported {} out of {} {kind} objects. There were {} failures.",
            tally.loaded, self.total, tally.failed
        )?;
        if tally.skipped > 0 {
            write!(
                f,
                "\n{} {kind} objects were skipped because their name field was missing or blank.",
                tally.skipped
            )?;
        }
        if tally.exists > 0 {
            write!(
                f,
                "\n{} {kind} objects were already on the server and did not get overwritten.",
                tally.exists
            )?;
        }
        if tally.retryable() > 0 {
            write!(
                f,
                "\nRerun with '{}' to retry {} skipped or failed objects.",
                self.rerun_flags(),
                tally.retryable()
            )?;
        }
        Ok(())
    }
}
