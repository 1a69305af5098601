//! Keycloak outbound adapters.
//!
//! This module provides a reqwest implementation of the `IdentityAdminApi`
//! port against the Keycloak admin REST API.

mod dto;
mod http_api;

pub use http_api::{KeycloakAdminApi, KeycloakCredentials, KeycloakEndpoint, TlsVerification};
