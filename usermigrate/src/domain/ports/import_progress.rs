//! Driven port for per-record progress indication.

use crate::domain::ObjectKind;

/// Port notified as an import pass resolves records.
pub trait ImportProgress: Send + Sync {
    /// A pass over `total` records of `kind` is starting.
    fn start(&self, kind: ObjectKind, total: usize);

    /// One more record has been resolved.
    fn advance(&self);

    /// The pass has ended, successfully or not.
    fn finish(&self);
}

/// Progress implementation that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpImportProgress;

impl ImportProgress for NoOpImportProgress {
    fn start(&self, _kind: ObjectKind, _total: usize) {}

    fn advance(&self) {}

    fn finish(&self) {}
}
