//! Run settings loaded via OrthoConfig and validated into a typed config.
//!
//! Values come from CLI flags, `USERMIGRATE_*` environment variables, and a
//! configuration file, in that order of precedence.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::{CacheReuse, DEFAULT_MAX_WORKERS, Error, MigrationRequest, ObjectKind};
use crate::outbound::keycloak::{KeycloakEndpoint, TlsVerification};
use crate::outbound::persistence::RecordShape;

const DEFAULT_ADMIN_REALM: &str = "master";
const DEFAULT_DATABASE_HOST: &str = "localhost";
const DEFAULT_DATABASE_PORT: u16 = 5432;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw settings for one migration run.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERMIGRATE")]
pub struct MigrationSettings {
    /// Keycloak server URL, including any context path.
    pub keycloak_url: Option<String>,
    /// Realm users and groups are created in.
    pub keycloak_realm: Option<String>,
    /// Realm the administrator authenticates against.
    pub keycloak_admin_realm: Option<String>,
    /// Administrator user name.
    pub keycloak_user: Option<String>,
    /// Administrator password. Prompted for when absent.
    pub keycloak_password: Option<String>,
    /// PEM file with an extra trusted root certificate.
    pub cacert: Option<PathBuf>,
    /// Skip server certificate verification.
    #[ortho_config(default = false)]
    pub insecure: bool,
    /// Record file to import instead of discovering users.
    pub file_input: Option<PathBuf>,
    /// Kind of records in the input: `user` or `group`.
    pub input_kind: Option<String>,
    /// Reuse (`true`) or rediscover (`false`) an existing user cache.
    pub reuse_cache: Option<bool>,
    /// Source database host.
    pub database_host: Option<String>,
    /// Source database port.
    pub database_port: Option<u16>,
    /// Source database name.
    pub database_name: Option<String>,
    /// Source database login role.
    pub database_user: Option<String>,
    /// Source database password. Prompted for when absent.
    pub database_password: Option<String>,
    /// Source table layout: `standard` or `flat`.
    pub user_model: Option<String>,
    /// Records imported concurrently.
    pub workers: Option<usize>,
    /// Per-request timeout for identity server calls, in seconds.
    pub request_timeout_secs: Option<u64>,
}

/// Server certificate trust selected by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsSource {
    /// Platform roots only.
    Verify,
    /// Platform roots plus the PEM file at this path.
    CaCert(PathBuf),
    /// No verification.
    Insecure,
}

impl TlsSource {
    /// Read any referenced certificate and build the verification policy.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error when the certificate file is unreadable.
    pub fn load(&self) -> Result<TlsVerification, Error> {
        match self {
            Self::Verify => Ok(TlsVerification::Verify),
            Self::Insecure => Ok(TlsVerification::Disabled),
            Self::CaCert(path) => std::fs::read(path)
                .map(TlsVerification::TrustRoot)
                .map_err(|error| {
                    Error::invalid_input(format!(
                        "cannot read CA certificate '{}': {error}",
                        path.display()
                    ))
                }),
        }
    }
}

/// Source database settings, present only when discovery may run.
pub struct DatabaseSettings {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Login role.
    pub user: String,
    /// Login password, if supplied up front.
    pub password: Option<Zeroizing<String>>,
    /// Table layout.
    pub shape: RecordShape,
}

/// Validated settings for one migration run.
pub struct MigrationConfig {
    /// Identity server location and realms.
    pub endpoint: KeycloakEndpoint,
    /// Administrator user name.
    pub admin_user: String,
    /// Administrator password, if supplied up front.
    pub admin_password: Option<Zeroizing<String>>,
    /// Certificate trust.
    pub tls: TlsSource,
    /// What to import.
    pub request: MigrationRequest,
    /// Discovery database, when discovery may run.
    pub database: Option<DatabaseSettings>,
    /// Records imported concurrently.
    pub workers: usize,
    /// Per-request timeout for identity server calls.
    pub request_timeout: Duration,
}

fn required(value: Option<String>, flag: &str) -> Result<String, Error> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::invalid_input(format!("--{flag} is required")))
}

fn positive<T>(value: Option<T>, default: T, flag: &str) -> Result<T, Error>
where
    T: PartialOrd + Default + Copy,
{
    let value = value.unwrap_or(default);
    if value <= T::default() {
        return Err(Error::invalid_input(format!("--{flag} must be at least 1")));
    }
    Ok(value)
}

impl MigrationSettings {
    /// Validate and type the raw settings.
    ///
    /// Database settings are required only when discovery may run, that is
    /// without `--file-input` and unless `--reuse-cache true` was given.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error naming the first unusable setting.
    pub fn validate(self) -> Result<MigrationConfig, Error> {
        let raw_url = required(self.keycloak_url, "keycloak-url")?;
        let server_url = Url::parse(&raw_url).map_err(|error| {
            Error::invalid_input(format!("--keycloak-url '{raw_url}' is not a URL: {error}"))
        })?;
        if !matches!(server_url.scheme(), "http" | "https") {
            return Err(Error::invalid_input(format!(
                "--keycloak-url '{raw_url}' must use http or https"
            )));
        }
        let endpoint = KeycloakEndpoint {
            server_url,
            realm: required(self.keycloak_realm, "keycloak-realm")?,
            admin_realm: self
                .keycloak_admin_realm
                .filter(|realm| !realm.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ADMIN_REALM.to_owned()),
        };

        let tls = match (self.cacert, self.insecure) {
            (Some(_), true) => {
                return Err(Error::invalid_input(
                    "--cacert and --insecure cannot be combined",
                ));
            }
            (Some(path), false) => TlsSource::CaCert(path),
            (None, true) => TlsSource::Insecure,
            (None, false) => TlsSource::Verify,
        };

        let input_kind = self
            .input_kind
            .as_deref()
            .map(str::parse::<ObjectKind>)
            .transpose()
            .map_err(|error| Error::invalid_input(format!("--input-kind: {error}")))?
            .unwrap_or(ObjectKind::User);
        if input_kind == ObjectKind::Group && self.file_input.is_none() {
            return Err(Error::invalid_input(
                "--input-kind group requires --file-input",
            ));
        }

        let cache_reuse = CacheReuse::from(self.reuse_cache);
        let may_discover = self.file_input.is_none() && cache_reuse != CacheReuse::Reuse;
        let database = if may_discover {
            let shape = self
                .user_model
                .as_deref()
                .map(str::parse::<RecordShape>)
                .transpose()
                .map_err(|error| Error::invalid_input(format!("--user-model: {error}")))?
                .unwrap_or_default();
            Some(DatabaseSettings {
                host: self
                    .database_host
                    .filter(|host| !host.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DATABASE_HOST.to_owned()),
                port: self.database_port.unwrap_or(DEFAULT_DATABASE_PORT),
                name: required(self.database_name, "database-name")?,
                user: required(self.database_user, "database-user")?,
                password: self.database_password.map(Zeroizing::new),
                shape,
            })
        } else {
            None
        };

        Ok(MigrationConfig {
            endpoint,
            admin_user: required(self.keycloak_user, "keycloak-user")?,
            admin_password: self.keycloak_password.map(Zeroizing::new),
            tls,
            request: MigrationRequest {
                input_file: self.file_input,
                input_kind,
                cache_reuse,
            },
            database,
            workers: positive(self.workers, DEFAULT_MAX_WORKERS, "workers")?,
            request_timeout: Duration::from_secs(positive(
                self.request_timeout_secs,
                DEFAULT_REQUEST_TIMEOUT_SECS,
                "request-timeout-secs",
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings loading and validation.

    use std::ffi::OsString;
    use std::io::Write;

    use env_lock::lock_env;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::domain::ErrorCode;

    const VARIABLES: [&str; 18] = [
        "USERMIGRATE_KEYCLOAK_URL",
        "USERMIGRATE_KEYCLOAK_REALM",
        "USERMIGRATE_KEYCLOAK_ADMIN_REALM",
        "USERMIGRATE_KEYCLOAK_USER",
        "USERMIGRATE_KEYCLOAK_PASSWORD",
        "USERMIGRATE_CACERT",
        "USERMIGRATE_INSECURE",
        "USERMIGRATE_FILE_INPUT",
        "USERMIGRATE_INPUT_KIND",
        "USERMIGRATE_REUSE_CACHE",
        "USERMIGRATE_DATABASE_HOST",
        "USERMIGRATE_DATABASE_PORT",
        "USERMIGRATE_DATABASE_NAME",
        "USERMIGRATE_DATABASE_USER",
        "USERMIGRATE_DATABASE_PASSWORD",
        "USERMIGRATE_USER_MODEL",
        "USERMIGRATE_WORKERS",
        "USERMIGRATE_REQUEST_TIMEOUT_SECS",
    ];

    fn load_with_env(overrides: &[(&str, &str)]) -> MigrationSettings {
        let _guard = lock_env(VARIABLES.map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned());
            (name, value)
        }));
        MigrationSettings::load_from_iter([OsString::from("usermigrate")])
            .expect("settings should load")
    }

    fn file_run() -> MigrationSettings {
        MigrationSettings {
            keycloak_url: Some("https://kc.example/auth".to_owned()),
            keycloak_realm: Some("acme".to_owned()),
            keycloak_admin_realm: None,
            keycloak_user: Some("admin".to_owned()),
            keycloak_password: None,
            cacert: None,
            insecure: false,
            file_input: Some(PathBuf::from("users.jsonl")),
            input_kind: None,
            reuse_cache: None,
            database_host: None,
            database_port: None,
            database_name: None,
            database_user: None,
            database_password: None,
            user_model: None,
            workers: None,
            request_timeout_secs: None,
        }
    }

    fn discovery_run() -> MigrationSettings {
        MigrationSettings {
            file_input: None,
            database_name: Some("identity".to_owned()),
            database_user: Some("reader".to_owned()),
            ..file_run()
        }
    }

    fn invalid_message(settings: MigrationSettings) -> String {
        let Err(error) = settings.validate() else {
            panic!("settings should be rejected");
        };
        assert_eq!(error.code(), ErrorCode::InvalidInput);
        error.message().to_owned()
    }

    #[rstest]
    fn unset_environment_leaves_everything_optional() {
        let settings = load_with_env(&[]);
        assert!(settings.keycloak_url.is_none());
        assert!(!settings.insecure);
        assert!(settings.reuse_cache.is_none());
        assert!(settings.workers.is_none());
    }

    #[rstest]
    fn environment_values_are_read() {
        let settings = load_with_env(&[
            ("USERMIGRATE_KEYCLOAK_URL", "https://kc.example"),
            ("USERMIGRATE_KEYCLOAK_REALM", "acme"),
            ("USERMIGRATE_INSECURE", "true"),
            ("USERMIGRATE_REUSE_CACHE", "false"),
            ("USERMIGRATE_WORKERS", "3"),
            ("USERMIGRATE_DATABASE_PORT", "6543"),
        ]);
        assert_eq!(settings.keycloak_url.as_deref(), Some("https://kc.example"));
        assert_eq!(settings.keycloak_realm.as_deref(), Some("acme"));
        assert!(settings.insecure);
        assert_eq!(settings.reuse_cache, Some(false));
        assert_eq!(settings.workers, Some(3));
        assert_eq!(settings.database_port, Some(6543));
    }

    #[rstest]
    fn file_runs_apply_defaults_and_skip_the_database() {
        let config = file_run().validate().expect("valid settings");

        assert_eq!(config.endpoint.admin_realm, "master");
        assert_eq!(config.endpoint.server_url.as_str(), "https://kc.example/auth");
        assert_eq!(config.tls, TlsSource::Verify);
        assert_eq!(config.request.input_kind, ObjectKind::User);
        assert_eq!(config.request.cache_reuse, CacheReuse::Ask);
        assert!(config.database.is_none());
        assert_eq!(config.workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[rstest]
    fn discovery_runs_need_database_settings() {
        let config = discovery_run().validate().expect("valid settings");
        let database = config.database.expect("database settings");

        assert_eq!(database.host, "localhost");
        assert_eq!(database.port, 5432);
        assert_eq!(database.name, "identity");
        assert_eq!(database.shape, RecordShape::Standard);
        assert!(database.password.is_none());
    }

    #[rstest]
    fn reusing_the_cache_needs_no_database() {
        let settings = MigrationSettings {
            reuse_cache: Some(true),
            database_name: None,
            ..discovery_run()
        };
        let config = settings.validate().expect("valid settings");
        assert_eq!(config.request.cache_reuse, CacheReuse::Reuse);
        assert!(config.database.is_none());
    }

    #[rstest]
    #[case::url(MigrationSettings { keycloak_url: None, ..discovery_run() }, "--keycloak-url")]
    #[case::realm(MigrationSettings { keycloak_realm: Some(" ".to_owned()), ..discovery_run() }, "--keycloak-realm")]
    #[case::user(MigrationSettings { keycloak_user: None, ..discovery_run() }, "--keycloak-user")]
    #[case::database(MigrationSettings { database_name: None, ..discovery_run() }, "--database-name")]
    #[case::scheme(MigrationSettings { keycloak_url: Some("ftp://kc.example".to_owned()), ..discovery_run() }, "http or https")]
    #[case::workers(MigrationSettings { workers: Some(0), ..discovery_run() }, "--workers")]
    #[case::timeout(MigrationSettings { request_timeout_secs: Some(0), ..discovery_run() }, "--request-timeout-secs")]
    #[case::kind(MigrationSettings { input_kind: Some("role".to_owned()), ..discovery_run() }, "--input-kind")]
    #[case::model(MigrationSettings { user_model: Some("ldap".to_owned()), ..discovery_run() }, "--user-model")]
    #[case::tls(MigrationSettings { insecure: true, cacert: Some(PathBuf::from("ca.pem")), ..discovery_run() }, "--cacert")]
    fn rejects_unusable_settings(#[case] settings: MigrationSettings, #[case] expected: &str) {
        let message = invalid_message(settings);
        assert!(message.contains(expected), "unexpected message: {message}");
    }

    #[rstest]
    fn group_input_requires_a_file() {
        let settings = MigrationSettings {
            input_kind: Some("group".to_owned()),
            ..discovery_run()
        };
        assert!(invalid_message(settings).contains("--file-input"));
    }

    #[rstest]
    fn group_input_from_a_file_is_accepted() {
        let settings = MigrationSettings {
            input_kind: Some("groups".to_owned()),
            ..file_run()
        };
        let config = settings.validate().expect("valid settings");
        assert_eq!(config.request.input_kind, ObjectKind::Group);
    }

    #[rstest]
    fn ca_certificates_are_read_from_disk() {
        let mut pem = NamedTempFile::new().expect("temp file");
        pem.write_all(b"-----BEGIN CERTIFICATE-----\n")
            .expect("write pem");

        let loaded = TlsSource::CaCert(pem.path().to_path_buf())
            .load()
            .expect("readable file");
        assert!(matches!(loaded, TlsVerification::TrustRoot(bytes) if !bytes.is_empty()));
    }

    #[rstest]
    fn missing_ca_certificates_are_invalid_input() {
        let error = TlsSource::CaCert(PathBuf::from("/nonexistent/ca.pem"))
            .load()
            .expect_err("missing file");
        assert_eq!(error.code(), ErrorCode::InvalidInput);
    }
}
