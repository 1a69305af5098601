//! Port bundle for the import worker pool.

use std::sync::Arc;

use crate::domain::ports::{IdentityAdminApi, ImportJournal, ImportProgress, RunReporter};

/// Port bundle required by the import worker pool.
#[derive(Clone)]
pub struct ImportWorkerPoolPorts {
    /// Admin API the records are created through.
    pub admin_api: Arc<dyn IdentityAdminApi>,
    /// Outcome log and retry cache.
    pub journal: Arc<dyn ImportJournal>,
    /// Operator-facing announcements.
    pub reporter: Arc<dyn RunReporter>,
    /// Per-record progress indication.
    pub progress: Arc<dyn ImportProgress>,
}

impl ImportWorkerPoolPorts {
    /// Build a strongly-typed worker pool port bundle.
    pub fn new(
        admin_api: Arc<dyn IdentityAdminApi>,
        journal: Arc<dyn ImportJournal>,
        reporter: Arc<dyn RunReporter>,
        progress: Arc<dyn ImportProgress>,
    ) -> Self {
        Self {
            admin_api,
            journal,
            reporter,
            progress,
        }
    }
}
