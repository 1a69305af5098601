//! Domain primitives and orchestration.
//!
//! Purpose: Define the records being migrated, the outcomes of importing
//! them, and the services that drive an import run through domain ports.
//! Nothing here knows about HTTP, SQL, or terminals.
//!
//! Public surface:
//! - Error (alias to `error::Error`): reason a run aborted.
//! - ErrorCode (alias to `error::ErrorCode`): stable abort category and exit
//!   code.
//! - Record / ObjectKind: opaque identity records and their import type.
//! - ImportOutcome / ImportTally / BatchReport: per-record and per-pass
//!   results.
//! - ImportWorkerPool: bounded-concurrency import of one batch.
//! - MigrationService: the whole run, stage by stage.

pub mod error;
pub mod group_derivation;
pub mod import_outcome;
pub mod import_worker_pool;
pub mod migration_run;
pub mod ports;
pub mod record;

pub use self::error::{Error, ErrorCode};
pub use self::group_derivation::derive_groups;
pub use self::import_outcome::{BatchReport, ImportOutcome, ImportTally};
pub use self::import_worker_pool::{
    DEFAULT_MAX_WORKERS, ImportWorkerPool, ImportWorkerPoolConfig, ImportWorkerPoolPorts,
};
pub use self::migration_run::{
    CacheReuse, MigrationPorts, MigrationReport, MigrationRequest, MigrationService,
    MigrationStatus, RunStage,
};
pub use self::record::{GROUPS_FIELD, ObjectKind, ParseObjectKindError, Record};
