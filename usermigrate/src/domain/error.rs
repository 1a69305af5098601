//! Domain-level error types.
//!
//! These errors are adapter agnostic. The binary maps them to a diagnostic on
//! stderr and a process exit code; nothing in the domain decides how a failure
//! is presented.

use std::fmt;

/// Stable machine-readable error code describing why a run aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// The identity server or its realm could not be reached.
    Connection,
    /// The identity server rejected the administrative credentials.
    Authentication,
    /// Discovering records from the database failed.
    Discovery,
    /// Input files, flags, or answers were unusable.
    InvalidInput,
    /// Writing caches or logs failed.
    Storage,
    /// An unexpected failure inside the tool itself.
    Internal,
}

impl ErrorCode {
    /// Process exit code reported for this category.
    ///
    /// # Examples
    /// ```
    /// use usermigrate::domain::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::Authentication.exit_code(), 2);
    /// assert_eq!(ErrorCode::Internal.exit_code(), 1);
    /// ```
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::Authentication => 2,
            Self::Connection => 3,
            Self::InvalidInput => 4,
            Self::Discovery => 5,
            Self::Storage => 6,
        }
    }

    /// Snake-case label used in structured log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::Discovery => "discovery",
            Self::InvalidInput => "invalid_input",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }

    const fn fallback_message(self) -> &'static str {
        match self {
            Self::Connection => "identity server unreachable",
            Self::Authentication => "identity server rejected the credentials",
            Self::Discovery => "record discovery failed",
            Self::InvalidInput => "invalid input",
            Self::Storage => "failed to write run state",
            Self::Internal => "internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that aborts a migration run.
///
/// ## Invariants
/// - `message` is never blank; a blank message is replaced by a generic
///   description of `code`.
///
/// # Examples
/// ```
/// use usermigrate::domain::{Error, ErrorCode};
///
/// let err = Error::connection("connection refused");
/// assert_eq!(err.code(), ErrorCode::Connection);
/// assert_eq!(err.to_string(), "connection refused");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    code: ErrorCode,
    message: String,
}

impl Error {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            code.fallback_message().to_owned()
        } else {
            message
        };
        Self { code, message }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.code.exit_code()
    }

    /// Prefix the message with the name of the stage that failed.
    ///
    /// # Examples
    /// ```
    /// use usermigrate::domain::Error;
    ///
    /// let err = Error::storage("disk full").in_stage("import groups");
    /// assert_eq!(err.message(), "import groups aborted: disk full");
    /// ```
    #[must_use]
    pub fn in_stage(self, stage: impl fmt::Display) -> Self {
        Self {
            code: self.code,
            message: format!("{stage} aborted: {}", self.message),
        }
    }

    /// Convenience constructor for [`ErrorCode::Connection`].
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Connection, message)
    }

    /// Convenience constructor for [`ErrorCode::Authentication`].
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Authentication, message)
    }

    /// Convenience constructor for [`ErrorCode::Discovery`].
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Discovery, message)
    }

    /// Convenience constructor for [`ErrorCode::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Convenience constructor for [`ErrorCode::Storage`].
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Storage, message)
    }

    /// Convenience constructor for [`ErrorCode::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}
