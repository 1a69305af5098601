//! Diesel-backed `RecordSource` adapter.
//!
//! Reads every account for the configured [`RecordShape`] in `id` order and
//! converts rows into user records. The password is resolved on first
//! discovery, so runs that reuse a cache never ask for it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::models::{UserAccountRow, UserGroupRow, UserRow};
use super::pool::{DatabaseConnection, DbPool, PoolConfig, PoolError};
use super::schema::{user_accounts, user_groups, users};
use crate::domain::Record;
use crate::domain::ports::{RecordSource, RecordSourceError};

/// Layout of the source tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordShape {
    /// `users` plus a `user_groups` membership table.
    #[default]
    Standard,
    /// `user_accounts` with a `groups text[]` column.
    Flat,
}

impl std::str::FromStr for RecordShape {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "flat" => Ok(Self::Flat),
            other => Err(format!(
                "unknown user model '{other}', expected 'standard' or 'flat'"
            )),
        }
    }
}

/// Supplies the database password when discovery first connects.
pub type PasswordSource =
    Box<dyn Fn() -> Result<Zeroizing<String>, RecordSourceError> + Send + Sync>;

/// Database that discovery reads from.
pub struct DiscoveryTarget {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Login role.
    pub user: String,
    /// Login password, resolved on demand.
    pub password: PasswordSource,
    /// Layout of the source tables.
    pub shape: RecordShape,
    /// Connection checkout timeout.
    pub connection_timeout: Duration,
}

impl DiscoveryTarget {
    fn pool_config(&self) -> Result<PoolConfig, RecordSourceError> {
        let connection = DatabaseConnection {
            host: self.host.clone(),
            port: self.port,
            name: self.name.clone(),
            user: self.user.clone(),
            password: (self.password)()?,
        };
        let database_url = connection.database_url().map_err(map_pool_error)?;
        Ok(PoolConfig::new(database_url).with_connection_timeout(self.connection_timeout))
    }
}

/// Discovers user records from PostgreSQL.
pub struct DieselRecordSource {
    target: Option<DiscoveryTarget>,
}

impl DieselRecordSource {
    /// Create an adapter that connects lazily on first discovery.
    pub fn new(target: DiscoveryTarget) -> Self {
        Self {
            target: Some(target),
        }
    }

    /// Create an adapter for runs configured without a database.
    ///
    /// Discovery fails with a connection error naming the missing settings.
    pub fn without_database() -> Self {
        Self { target: None }
    }
}

fn map_pool_error(error: PoolError) -> RecordSourceError {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    RecordSourceError::connection(message)
}

fn map_diesel_error(error: diesel::result::Error) -> RecordSourceError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "discovery query failed");
        }
        _ => debug!(error = %error, "discovery query failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            RecordSourceError::connection(info.message().to_owned())
        }
        other => RecordSourceError::query(other.to_string()),
    }
}

fn attach_memberships(rows: Vec<UserRow>, memberships: Vec<UserGroupRow>) -> Vec<Record> {
    let mut groups_by_user: HashMap<String, Vec<String>> = HashMap::new();
    for membership in memberships {
        groups_by_user
            .entry(membership.username)
            .or_default()
            .push(membership.group_name);
    }

    rows.into_iter()
        .map(|row| {
            let groups = row
                .username
                .as_ref()
                .and_then(|username| groups_by_user.remove(username))
                .unwrap_or_default();
            row.into_record(groups)
        })
        .collect()
}

#[async_trait]
impl RecordSource for DieselRecordSource {
    async fn discover_users(&self) -> Result<Vec<Record>, RecordSourceError> {
        let Some(target) = &self.target else {
            return Err(RecordSourceError::connection(
                "no source database is configured; pass --database-name and --database-user",
            ));
        };
        let shape = target.shape;
        let config = target.pool_config()?;
        let pool = DbPool::new(&config).await.map_err(map_pool_error)?;
        let mut conn = pool.get().await.map_err(map_pool_error)?;

        let records = match shape {
            RecordShape::Standard => {
                let rows: Vec<UserRow> = users::table
                    .select(UserRow::as_select())
                    .order(users::id.asc())
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;
                let memberships: Vec<UserGroupRow> = user_groups::table
                    .select(UserGroupRow::as_select())
                    .order(user_groups::id.asc())
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;
                attach_memberships(rows, memberships)
            }
            RecordShape::Flat => user_accounts::table
                .select(UserAccountRow::as_select())
                .order(user_accounts::id.asc())
                .load::<UserAccountRow>(&mut conn)
                .await
                .map_err(map_diesel_error)?
                .into_iter()
                .map(UserAccountRow::into_record)
                .collect(),
        };

        info!(shape = ?shape, count = records.len(), "discovered user records");
        Ok(records)
    }
}
