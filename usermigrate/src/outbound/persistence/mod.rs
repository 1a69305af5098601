//! PostgreSQL discovery adapter using Diesel ORM.
//!
//! Diesel row structs (`models.rs`) and schema definitions (`schema.rs`) are
//! internal; the domain only sees [`crate::domain::Record`]s through the
//! `RecordSource` port.

mod diesel_record_source;
mod models;
mod pool;
mod schema;

pub use diesel_record_source::{DieselRecordSource, DiscoveryTarget, PasswordSource, RecordShape};
pub use pool::{DatabaseConnection, PoolConfig, PoolError};
