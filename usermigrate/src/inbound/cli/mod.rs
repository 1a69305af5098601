//! Command-line inbound adapter.
//!
//! Loads layered settings, validates them into a [`MigrationConfig`], and
//! fills in secrets the operator did not supply up front.

mod settings;

pub use settings::{DatabaseSettings, MigrationConfig, MigrationSettings, TlsSource};

use zeroize::Zeroizing;

use crate::domain::Error;
use crate::domain::ports::PromptError;

/// Return `supplied`, or ask for the secret named `label` when it is absent.
///
/// # Errors
///
/// Returns an invalid-input error naming `flag` when no terminal is attached,
/// and an internal error when the terminal fails mid-prompt.
pub fn resolve_secret(
    supplied: Option<Zeroizing<String>>,
    label: &str,
    flag: &str,
    ask: impl FnOnce(&str) -> Result<Zeroizing<String>, PromptError>,
) -> Result<Zeroizing<String>, Error> {
    if let Some(secret) = supplied {
        return Ok(secret);
    }
    ask(label).map_err(|error| match error {
        PromptError::NotInteractive => Error::invalid_input(format!(
            "{label} is required: pass --{flag} or run in an interactive terminal"
        )),
        PromptError::Terminal { message } => Error::internal(message),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    #[rstest]
    fn supplied_secrets_are_used_without_asking() {
        let secret = resolve_secret(
            Some(Zeroizing::new("s3cret".to_owned())),
            "Keycloak password",
            "keycloak-password",
            |_| panic!("should not prompt"),
        )
        .expect("supplied");
        assert_eq!(secret.as_str(), "s3cret");
    }

    #[rstest]
    fn missing_secrets_are_prompted_for() {
        let secret = resolve_secret(None, "Database password", "database-password", |label| {
            assert_eq!(label, "Database password");
            Ok(Zeroizing::new("typed".to_owned()))
        })
        .expect("prompted");
        assert_eq!(secret.as_str(), "typed");
    }

    #[rstest]
    fn missing_secrets_without_a_terminal_are_invalid_input() {
        let error = resolve_secret(None, "Keycloak password", "keycloak-password", |_| {
            Err(PromptError::not_interactive())
        })
        .expect_err("no terminal");
        assert_eq!(error.code(), ErrorCode::InvalidInput);
        assert!(error.message().contains("--keycloak-password"));
    }
}
