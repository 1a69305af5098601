//! Driven port for the identity server's administrative API.
//!
//! Adapters own the session handshake and the transport. The domain only
//! sees the four outcomes of a create call: created, conflict, rejected
//! credentials, or any other failure.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{ObjectKind, Record};

define_port_error! {
    /// Errors raised by the admin API.
    pub enum AdminApiError {
        /// The server or realm could not be reached.
        Connection { message: String } =>
            "identity server unreachable: {message}",
        /// Credentials were rejected or no session is open.
        Authentication { message: String } =>
            "identity server rejected credentials: {message}",
        /// The object already exists on the server.
        Conflict { message: String } =>
            "object already exists: {message}",
        /// Any other transport or server failure.
        Communication { message: String } =>
            "identity server request failed: {message}",
    }
}

/// Port for creating users and groups on the identity server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityAdminApi: Send + Sync {
    /// Probe the server and target realm without authenticating.
    async fn check_connection(&self) -> Result<(), AdminApiError>;

    /// Acquire an authenticated admin session.
    async fn open_session(&self) -> Result<(), AdminApiError>;

    /// Release the admin session. Closing without a session is a no-op.
    async fn close_session(&self) -> Result<(), AdminApiError>;

    /// Create `record` as a `kind` object.
    ///
    /// Must never overwrite: an existing object yields
    /// [`AdminApiError::Conflict`].
    async fn create_object(&self, kind: ObjectKind, record: &Record) -> Result<(), AdminApiError>;
}
