//! Bounded-concurrency import of one batch of records.
//!
//! The pool spawns one task per record and admits at most
//! [`ImportWorkerPoolConfig::max_workers`] of them into the admin API at a
//! time. Each record resolves to exactly one [`ImportOutcome`]; skipped and
//! failed records are journaled for retry. Rejected credentials or a failed
//! journal write end the whole batch.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::domain::ports::{IdentityAdminApi, ImportJournal, ImportProgress, RunReporter};
use crate::domain::{BatchReport, Error, ImportOutcome, ImportTally, ObjectKind, Record};

mod attempt;
mod ports;

use attempt::{AttemptAbort, AttemptContext};
pub use ports::ImportWorkerPoolPorts;

/// Default number of records imported concurrently.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Worker pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportWorkerPoolConfig {
    /// Records imported concurrently. Zero is treated as one.
    pub max_workers: usize,
}

impl Default for ImportWorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// Domain-owned import worker pool.
pub struct ImportWorkerPool {
    admin_api: Arc<dyn IdentityAdminApi>,
    journal: Arc<dyn ImportJournal>,
    reporter: Arc<dyn RunReporter>,
    progress: Arc<dyn ImportProgress>,
    config: ImportWorkerPoolConfig,
}

impl ImportWorkerPool {
    /// Build a pool over the given ports.
    pub fn new(ports: ImportWorkerPoolPorts, config: ImportWorkerPoolConfig) -> Self {
        Self {
            admin_api: ports.admin_api,
            journal: ports.journal,
            reporter: ports.reporter,
            progress: ports.progress,
            config,
        }
    }

    /// Import `records` as `kind` objects and report the tally.
    ///
    /// The summary is written to the outcome log and announced before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ErrorCode::Authentication`] when the server
    /// rejects the session mid-batch, [`crate::domain::ErrorCode::Storage`] when
    /// the journal cannot be reset or written, and
    /// [`crate::domain::ErrorCode::Internal`] when a worker panics. No summary
    /// is produced for an aborted batch.
    ///
    /// ```rust,ignore
    /// let report = pool.run_pass(ObjectKind::Group, groups).await?;
    /// assert_eq!(report.tally.resolved(), report.total);
    /// # Ok::<(), usermigrate::domain::Error>(())
    /// ```
    pub async fn run_pass(
        &self,
        kind: ObjectKind,
        records: Vec<Record>,
    ) -> Result<BatchReport, Error> {
        self.reporter.announce(&format!("Starting {kind} import."));
        let locations = self
            .journal
            .begin_pass(kind)
            .map_err(|error| Error::storage(error.to_string()))?;
        if locations.removed_previous_log {
            self.reporter.announce("Removing previous log file.");
        }
        if locations.removed_previous_retry_cache {
            self.reporter.announce("Removing previous retry cache.");
        }
        self.reporter
            .announce(&format!("Writing errors to {}.", locations.log.display()));

        let total = records.len();
        self.reporter
            .announce(&format!("Importing {total} {kind} objects into Keycloak."));

        self.progress.start(kind, total);
        let tally = self.import_all(kind, records).await;
        self.progress.finish();
        let tally = tally?;

        let report = BatchReport {
            kind,
            total,
            tally,
            log: locations.log,
            retry_cache: locations.retry_cache,
        };
        let summary = report.summary();
        self.journal
            .log(kind, &summary)
            .map_err(|error| Error::storage(error.to_string()))?;
        self.reporter.announce(&summary);

        info!(
            %kind,
            total,
            loaded = tally.loaded,
            exists = tally.exists,
            skipped = tally.skipped,
            failed = tally.failed,
            "import pass finished"
        );
        Ok(report)
    }

    async fn import_all(
        &self,
        kind: ObjectKind,
        records: Vec<Record>,
    ) -> Result<ImportTally, Error> {
        let context = Arc::new(AttemptContext::new(
            kind,
            Arc::clone(&self.admin_api),
            Arc::clone(&self.journal),
        ));
        let permits = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut tasks = JoinSet::new();

        for record in records {
            let context = Arc::clone(&context);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| AttemptAbort::PoolClosed)?;
                context.import_record(record).await
            });
        }

        let mut tally = ImportTally::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => self.resolve(&mut tally, outcome),
                // Another attempt raised the abort flag and reports the cause.
                Ok(Err(AttemptAbort::Cancelled)) => {}
                Ok(Err(abort)) => {
                    context.abort();
                    tasks.abort_all();
                    return Err(abort.into_error(kind));
                }
                Err(join_error) => {
                    error!(%kind, error = %join_error, "import worker crashed");
                    context.abort();
                    tasks.abort_all();
                    return Err(Error::internal(format!(
                        "{kind} import worker crashed: {join_error}"
                    )));
                }
            }
        }

        if context.is_aborted() {
            return Err(AttemptAbort::Cancelled.into_error(kind));
        }
        Ok(tally)
    }

    fn resolve(&self, tally: &mut ImportTally, outcome: ImportOutcome) {
        tally.record(outcome);
        self.progress.advance();
    }
}
