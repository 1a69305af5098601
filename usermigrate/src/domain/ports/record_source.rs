//! Driven port for discovering user records in the source database.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::Record;

define_port_error! {
    /// Errors raised while discovering records.
    pub enum RecordSourceError {
        /// The database could not be reached or the pool could not be built.
        Connection { message: String } =>
            "user database unreachable: {message}",
        /// The database password could not be obtained.
        Credentials { message: String } =>
            "database credentials unavailable: {message}",
        /// The discovery query failed.
        Query { message: String } =>
            "user discovery query failed: {message}",
    }
}

/// Port for reading every user record, with group memberships, from the
/// source system.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Return all user records in the shape the identity server accepts.
    async fn discover_users(&self) -> Result<Vec<Record>, RecordSourceError>;
}
