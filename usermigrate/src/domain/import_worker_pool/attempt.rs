//! One worker's attempt at importing one record.
//!
//! Attempts share a batch-wide abort flag. It is raised by the first attempt
//! that hits rejected credentials or cannot journal its outcome, and every
//! later attempt checks it before touching the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::domain::ports::{AdminApiError, IdentityAdminApi, ImportJournal, ImportJournalError};
use crate::domain::{Error, ImportOutcome, ObjectKind, Record};

/// Conditions that end a whole batch rather than a single record.
#[derive(Debug)]
pub(super) enum AttemptAbort {
    Authentication(AdminApiError),
    Journal(ImportJournalError),
    Cancelled,
    PoolClosed,
}

impl AttemptAbort {
    pub(super) fn into_error(self, kind: ObjectKind) -> Error {
        match self {
            Self::Authentication(error) => {
                Error::authentication(format!("{kind} import aborted: {error}"))
            }
            Self::Journal(error) => Error::storage(format!("{kind} import aborted: {error}")),
            Self::Cancelled => Error::internal(format!("{kind} import was cancelled")),
            Self::PoolClosed => Error::internal("import worker semaphore closed"),
        }
    }
}

/// State shared by every attempt of one batch.
pub(super) struct AttemptContext {
    kind: ObjectKind,
    admin_api: Arc<dyn IdentityAdminApi>,
    journal: Arc<dyn ImportJournal>,
    aborted: AtomicBool,
}

impl AttemptContext {
    pub(super) fn new(
        kind: ObjectKind,
        admin_api: Arc<dyn IdentityAdminApi>,
        journal: Arc<dyn ImportJournal>,
    ) -> Self {
        Self {
            kind,
            admin_api,
            journal,
            aborted: AtomicBool::new(false),
        }
    }

    pub(super) fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub(super) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub(super) async fn import_record(&self, record: Record) -> Result<ImportOutcome, AttemptAbort> {
        if self.is_aborted() {
            return Err(AttemptAbort::Cancelled);
        }

        let kind = self.kind;
        let Some(name) = record.name(kind) else {
            self.write_log(&format!("Name field missing from {record}, skipping"))?;
            self.queue_retry(&record)?;
            return Ok(ImportOutcome::Skipped);
        };

        match self.admin_api.create_object(kind, &record).await {
            Ok(()) => {
                debug!(%kind, %name, "object created");
                Ok(ImportOutcome::Loaded)
            }
            Err(AdminApiError::Conflict { .. }) => {
                self.write_log(&format!(
                    "The {kind} {name} already exists, cannot overwrite."
                ))?;
                Ok(ImportOutcome::Exists)
            }
            Err(error @ AdminApiError::Authentication { .. }) => {
                warn!(%kind, %name, error = %error, "credentials rejected, aborting batch");
                self.abort();
                Err(AttemptAbort::Authentication(error))
            }
            Err(error) => {
                debug!(%kind, %name, error_kind = error.kind(), "object import failed");
                self.write_log(&format!(
                    "Failed to import {kind} {record}, error was: {error}"
                ))?;
                self.queue_retry(&record)?;
                Ok(ImportOutcome::Failed)
            }
        }
    }

    fn write_log(&self, message: &str) -> Result<(), AttemptAbort> {
        self.journal
            .log(self.kind, message)
            .map_err(|error| self.journal_abort(error))
    }

    fn queue_retry(&self, record: &Record) -> Result<(), AttemptAbort> {
        self.journal
            .queue_retry(self.kind, record)
            .map_err(|error| self.journal_abort(error))
    }

    fn journal_abort(&self, error: ImportJournalError) -> AttemptAbort {
        warn!(kind = %self.kind, error = %error, "journal write failed, aborting batch");
        self.abort();
        AttemptAbort::Journal(error)
    }
}
