//! Test utilities for the usermigrate crate.
//!
//! This module provides shared port doubles for both unit tests (in `src/`)
//! and integration tests (in `tests/`). It is only compiled for tests or with
//! the `test-support` feature.

pub mod import_doubles;
