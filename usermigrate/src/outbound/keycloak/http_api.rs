//! Reqwest-backed Keycloak admin API adapter.
//!
//! This adapter owns transport details only: the password-grant session, token
//! refresh, TLS trust, and mapping HTTP statuses onto `AdminApiError`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode, Url};
use tokio::sync::RwLock;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::dto::{KeycloakErrorDto, SessionTokens, TokenResponseDto};
use crate::domain::ports::{AdminApiError, IdentityAdminApi};
use crate::domain::{ObjectKind, Record};

const ADMIN_CLIENT_ID: &str = "admin-cli";

/// Where the Keycloak server lives and which realms the run touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeycloakEndpoint {
    /// Base URL of the server, including any context path such as `/auth`.
    pub server_url: Url,
    /// Realm users and groups are created in.
    pub realm: String,
    /// Realm the administrator authenticates against.
    pub admin_realm: String,
}

/// Administrator credentials for the password grant.
pub struct KeycloakCredentials {
    /// Administrator user name.
    pub username: String,
    /// Administrator password.
    pub password: Zeroizing<String>,
}

/// Server certificate verification policy.
#[derive(Debug, Clone, Default)]
pub enum TlsVerification {
    /// Verify against the platform roots.
    #[default]
    Verify,
    /// Verify against the platform roots plus one PEM-encoded root.
    TrustRoot(Vec<u8>),
    /// Accept any certificate.
    Disabled,
}

/// Keycloak admin API adapter holding one admin session.
pub struct KeycloakAdminApi {
    client: Client,
    endpoint: KeycloakEndpoint,
    credentials: KeycloakCredentials,
    session: RwLock<Option<SessionTokens>>,
}

impl KeycloakAdminApi {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let api = KeycloakAdminApi::new(endpoint, credentials, TlsVerification::Verify, timeout)?;
    /// api.check_connection().await?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the trusted root is not valid PEM or the reqwest
    /// client cannot be constructed.
    pub fn new(
        endpoint: KeycloakEndpoint,
        credentials: KeycloakCredentials,
        tls: TlsVerification,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().timeout(timeout);
        match tls {
            TlsVerification::Verify => {}
            TlsVerification::TrustRoot(pem) => {
                builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
            }
            TlsVerification::Disabled => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }
        Ok(Self {
            client: builder.build()?,
            endpoint,
            credentials,
            session: RwLock::new(None),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, AdminApiError> {
        endpoint_url(&self.endpoint.server_url, segments)
    }

    fn token_url(&self) -> Result<Url, AdminApiError> {
        self.url(&[
            "realms",
            &self.endpoint.admin_realm,
            "protocol",
            "openid-connect",
            "token",
        ])
    }

    async fn request_tokens(
        &self,
        form: &[(&str, &str)],
    ) -> Result<TokenResponseDto, AdminApiError> {
        let response = self
            .client
            .post(self.token_url()?)
            .form(form)
            .send()
            .await
            .map_err(|error| AdminApiError::connection(error.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| AdminApiError::connection(error.to_string()))?;
        if !status.is_success() {
            return Err(map_token_status(status, body.as_ref()));
        }
        serde_json::from_slice(body.as_ref()).map_err(|error| {
            AdminApiError::communication(format!("invalid token response: {error}"))
        })
    }

    async fn bearer(&self) -> Result<(Zeroizing<String>, u64), AdminApiError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| (session.access_token.clone(), session.generation))
            .ok_or_else(|| AdminApiError::authentication("no admin session is open"))
    }

    async fn refresh(&self, stale_generation: u64) -> Result<(), AdminApiError> {
        let mut session = self.session.write().await;
        let Some(current) = session.as_ref() else {
            return Err(AdminApiError::authentication("no admin session is open"));
        };
        if current.generation != stale_generation {
            return Ok(());
        }
        let Some(refresh_token) = current.refresh_token.clone() else {
            return Err(AdminApiError::authentication(
                "access token expired and no refresh token was issued",
            ));
        };

        debug!(generation = stale_generation, "refreshing admin access token");
        let tokens = self
            .request_tokens(&[
                ("grant_type", "refresh_token"),
                ("client_id", ADMIN_CLIENT_ID),
                ("refresh_token", refresh_token.as_str()),
            ])
            .await?;
        *session = Some(tokens.into_session(stale_generation + 1));
        Ok(())
    }

    async fn post_record(
        &self,
        url: Url,
        token: &str,
        record: &Record,
    ) -> Result<(StatusCode, Vec<u8>), AdminApiError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(record)
            .send()
            .await
            .map_err(|error| AdminApiError::communication(error.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| AdminApiError::communication(error.to_string()))?;
        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl IdentityAdminApi for KeycloakAdminApi {
    async fn check_connection(&self) -> Result<(), AdminApiError> {
        let url = self.url(&["realms", &self.endpoint.realm])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| AdminApiError::connection(error.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(AdminApiError::connection(format!(
            "realm '{}' is not available: {}",
            self.endpoint.realm,
            status_message(status, body.as_ref())
        )))
    }

    async fn open_session(&self) -> Result<(), AdminApiError> {
        let tokens = self
            .request_tokens(&[
                ("grant_type", "password"),
                ("client_id", ADMIN_CLIENT_ID),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .await?;
        let mut session = self.session.write().await;
        let generation = session.as_ref().map_or(0, |current| current.generation + 1);
        *session = Some(tokens.into_session(generation));
        info!(
            realm = %self.endpoint.admin_realm,
            user = %self.credentials.username,
            "admin session opened"
        );
        Ok(())
    }

    async fn close_session(&self) -> Result<(), AdminApiError> {
        let Some(tokens) = self.session.write().await.take() else {
            return Ok(());
        };
        let Some(refresh_token) = tokens.refresh_token else {
            return Ok(());
        };

        let url = self.url(&[
            "realms",
            &self.endpoint.admin_realm,
            "protocol",
            "openid-connect",
            "logout",
        ])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(tokens.access_token.as_str())
            .form(&[
                ("client_id", ADMIN_CLIENT_ID),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|error| AdminApiError::communication(error.to_string()))?;
        let status = response.status();
        if status.is_success() {
            debug!("admin session closed");
            return Ok(());
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(AdminApiError::communication(status_message(
            status,
            body.as_ref(),
        )))
    }

    async fn create_object(&self, kind: ObjectKind, record: &Record) -> Result<(), AdminApiError> {
        let url = self.url(&["admin", "realms", &self.endpoint.realm, kind.collection()])?;
        let (token, generation) = self.bearer().await?;
        let (mut status, mut body) = self.post_record(url.clone(), &token, record).await?;

        if status == StatusCode::UNAUTHORIZED {
            self.refresh(generation).await?;
            let (token, _) = self.bearer().await?;
            (status, body) = self.post_record(url, &token, record).await?;
        }
        classify_create_status(status, &body)
    }
}

fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, AdminApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| AdminApiError::connection(format!("'{base}' cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn classify_create_status(status: StatusCode, body: &[u8]) -> Result<(), AdminApiError> {
    if status.is_success() {
        return Ok(());
    }
    let message = status_message(status, body);
    match status {
        StatusCode::CONFLICT => Err(AdminApiError::conflict(message)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(AdminApiError::authentication(message))
        }
        _ => Err(AdminApiError::communication(message)),
    }
}

fn map_token_status(status: StatusCode, body: &[u8]) -> AdminApiError {
    let message = status_message(status, body);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AdminApiError::authentication(message)
        }
        StatusCode::NOT_FOUND => AdminApiError::connection(message),
        _ => AdminApiError::communication(message),
    }
}

fn status_message(status: StatusCode, body: &[u8]) -> String {
    let detail = KeycloakErrorDto::parse(body).unwrap_or_else(|| body_preview(body));
    if detail.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {detail}", status.as_u16())
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
