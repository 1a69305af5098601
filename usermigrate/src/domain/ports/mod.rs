//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_reuse_prompt;
mod identity_admin_api;
mod import_journal;
mod import_progress;
mod record_cache;
mod record_source;
mod run_reporter;

#[cfg(test)]
pub use cache_reuse_prompt::MockCacheReusePrompt;
pub use cache_reuse_prompt::{CacheReusePrompt, PromptError};
#[cfg(test)]
pub use identity_admin_api::MockIdentityAdminApi;
pub use identity_admin_api::{AdminApiError, IdentityAdminApi};
#[cfg(test)]
pub use import_journal::MockImportJournal;
pub use import_journal::{ImportJournal, ImportJournalError, JournalLocations};
pub use import_progress::{ImportProgress, NoOpImportProgress};
#[cfg(test)]
pub use record_cache::MockRecordCache;
pub use record_cache::{RecordCache, RecordCacheError};
#[cfg(test)]
pub use record_source::MockRecordSource;
pub use record_source::{RecordSource, RecordSourceError};
#[cfg(test)]
pub use run_reporter::MockRunReporter;
pub use run_reporter::RunReporter;
