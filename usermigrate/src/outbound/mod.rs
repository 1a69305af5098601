//! Outbound adapters implementing the domain ports.

pub mod keycloak;
pub mod persistence;
pub mod record_files;
pub mod terminal;
