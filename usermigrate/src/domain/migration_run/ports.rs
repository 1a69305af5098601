//! Port bundle for the migration service.

use std::sync::Arc;

use crate::domain::ports::{
    CacheReusePrompt, IdentityAdminApi, ImportJournal, ImportProgress, RecordCache, RecordSource,
    RunReporter,
};

/// Port bundle required by the migration service.
pub struct MigrationPorts {
    /// Identity server admin API.
    pub admin_api: Arc<dyn IdentityAdminApi>,
    /// Source database discovery.
    pub record_source: Arc<dyn RecordSource>,
    /// Discovery cache and input files.
    pub record_cache: Arc<dyn RecordCache>,
    /// Outcome log and retry cache.
    pub journal: Arc<dyn ImportJournal>,
    /// Cache reuse question.
    pub prompt: Arc<dyn CacheReusePrompt>,
    /// Operator-facing announcements.
    pub reporter: Arc<dyn RunReporter>,
    /// Per-record progress indication.
    pub progress: Arc<dyn ImportProgress>,
}
