//! Async connection pool for Diesel PostgreSQL connections.
//!
//! Wraps `diesel-async` and `bb8`. The pool is only built when discovery runs,
//! so runs that reuse a cache or read a file never touch the database.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use url::Url;
use zeroize::Zeroizing;

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Failed to check out a connection from the pool.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    /// Failed to build the connection pool.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

/// Connection parameters for the source database.
pub struct DatabaseConnection {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Login role.
    pub user: String,
    /// Login password.
    pub password: Zeroizing<String>,
}

impl DatabaseConnection {
    /// Render a `postgres://` URL with user and password percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] when the host is not a valid URL host.
    pub fn database_url(&self) -> Result<Zeroizing<String>, PoolError> {
        let mut url = Url::parse("postgres://localhost/")
            .map_err(|error| PoolError::build(error.to_string()))?;
        url.set_host(Some(&self.host))
            .map_err(|error| PoolError::build(format!("invalid database host: {error}")))?;
        let credentials_rejected = |()| PoolError::build("database URL cannot carry credentials");
        url.set_port(Some(self.port)).map_err(credentials_rejected)?;
        url.set_username(&self.user).map_err(credentials_rejected)?;
        url.set_password(Some(self.password.as_str()))
            .map_err(credentials_rejected)?;
        url.set_path(&self.name);
        Ok(Zeroizing::new(url.into()))
    }
}

/// Configuration for the database connection pool.
///
/// # Example
///
/// ```ignore
/// let config = PoolConfig::new(connection.database_url()?)
///     .with_connection_timeout(Duration::from_secs(10));
/// ```
#[derive(Clone)]
pub struct PoolConfig {
    database_url: Zeroizing<String>,
    max_size: u32,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Create a new configuration with the given database URL.
    ///
    /// Defaults to a single connection and a 30 second checkout timeout;
    /// discovery runs one query at a time.
    pub fn new(database_url: Zeroizing<String>) -> Self {
        Self {
            database_url,
            max_size: 1,
            connection_timeout: Duration::from_secs(30),
        }
    }

    /// Set the connection checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Async connection pool for PostgreSQL via Diesel.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Create a new connection pool with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Build` if the pool cannot be constructed.
    pub async fn new(config: &PoolConfig) -> Result<Self, PoolError> {
        let manager =
            AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.database_url.as_str());

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(None)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self { inner: pool })
    }

    /// Get a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Checkout` if a connection cannot be obtained within
    /// the configured timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}
