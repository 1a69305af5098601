//! DTOs for decoding Keycloak token and error responses.

use serde::Deserialize;
use zeroize::Zeroizing;

#[derive(Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) access_token: String,
    #[serde(default)]
    pub(super) refresh_token: Option<String>,
}

/// Tokens of an open admin session.
pub(super) struct SessionTokens {
    pub(super) access_token: Zeroizing<String>,
    pub(super) refresh_token: Option<Zeroizing<String>>,
    /// Bumped on every refresh so concurrent workers refresh only once.
    pub(super) generation: u64,
}

impl TokenResponseDto {
    pub(super) fn into_session(self, generation: u64) -> SessionTokens {
        SessionTokens {
            access_token: Zeroizing::new(self.access_token),
            refresh_token: self.refresh_token.map(Zeroizing::new),
            generation,
        }
    }
}

/// Error payloads Keycloak returns from the token and admin endpoints.
#[derive(Debug, Default, Deserialize)]
pub(super) struct KeycloakErrorDto {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

impl KeycloakErrorDto {
    pub(super) fn parse(body: &[u8]) -> Option<String> {
        let dto: Self = serde_json::from_slice(body).ok()?;
        dto.error_message
            .or(dto.error_description)
            .or(dto.error)
            .filter(|message| !message.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for Keycloak error payload decoding.
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::admin_api(r#"{"errorMessage":"User exists with same username"}"#, Some("User exists with same username"))]
    #[case::oauth(r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#, Some("Invalid user credentials"))]
    #[case::bare_code(r#"{"error":"unauthorized_client"}"#, Some("unauthorized_client"))]
    #[case::not_json("<html>Bad Gateway</html>", None)]
    #[case::empty_object("{}", None)]
    fn extracts_the_most_specific_message(#[case] body: &str, #[case] expected: Option<&str>) {
        assert_eq!(KeycloakErrorDto::parse(body.as_bytes()).as_deref(), expected);
    }
}
