//! Migrate users and groups from a relational database into a Keycloak realm.
//!
//! The crate is laid out hexagonally: [`domain`] owns records, outcomes, and
//! the import orchestration behind ports; [`outbound`] adapts those ports to
//! Keycloak, PostgreSQL, the filesystem, and the terminal; [`inbound`] turns
//! command-line flags, environment variables, and config files into a
//! validated run configuration.

pub mod domain;
pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
