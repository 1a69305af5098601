//! `usermigrate` entry-point: wires adapters into the migration service.
//!
//! Exit status is 0 when every planned pass ran, even if individual records
//! failed; aborted runs exit with the code of their error category.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use color_eyre::eyre::Report;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use usermigrate::domain::ports::{RecordSource, RecordSourceError, RunReporter};
use usermigrate::domain::{
    Error, ImportWorkerPoolConfig, MigrationPorts, MigrationService, MigrationStatus,
};
use usermigrate::inbound::cli::{
    DatabaseSettings, MigrationConfig, MigrationSettings, resolve_secret,
};
use usermigrate::outbound::keycloak::{KeycloakAdminApi, KeycloakCredentials};
use usermigrate::outbound::persistence::{DieselRecordSource, DiscoveryTarget};
use usermigrate::outbound::record_files::{FileImportJournal, FileRecordCache};
use usermigrate::outbound::terminal::{IndicatifProgress, StdoutReporter, TerminalPrompt};

fn main() -> ExitCode {
    init_tracing();
    if let Err(e) = color_eyre::install() {
        warn!(error = %e, "error report handler install failed");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            let code = failure.exit_code();
            error!(code = %failure.code(), "migration aborted");
            eprintln!("Error: {:?}", Report::new(failure));
            ExitCode::from(code)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Err(e) = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

fn run() -> Result<(), Error> {
    let settings = MigrationSettings::load()
        .map_err(|load_error| Error::invalid_input(load_error.to_string()))?;
    let config = settings.validate()?;
    let MigrationConfig {
        endpoint,
        admin_user,
        admin_password,
        tls,
        request,
        database,
        workers,
        request_timeout,
    } = config;

    let prompt = TerminalPrompt;
    let admin_password = resolve_secret(
        admin_password,
        "Keycloak admin password",
        "keycloak-password",
        |label| prompt.secret(label),
    )?;
    let record_source: Arc<dyn RecordSource> = match database {
        Some(database) => Arc::new(diesel_record_source(database, request_timeout)),
        None => Arc::new(DieselRecordSource::without_database()),
    };

    let reporter = Arc::new(StdoutReporter);
    reporter.announce(&format!(
        "Checking connection to Keycloak server at '{}'",
        endpoint.server_url
    ));
    let admin_api = KeycloakAdminApi::new(
        endpoint,
        KeycloakCredentials {
            username: admin_user,
            password: admin_password,
        },
        tls.load()?,
        request_timeout,
    )
    .map_err(|client_error| {
        Error::invalid_input(format!("cannot configure HTTP client: {client_error}"))
    })?;

    let base_dir = working_directory()?;
    let service = MigrationService::new(
        MigrationPorts {
            admin_api: Arc::new(admin_api),
            record_source,
            record_cache: Arc::new(FileRecordCache::new(&base_dir)),
            journal: Arc::new(FileImportJournal::new(&base_dir)),
            prompt: Arc::new(prompt),
            reporter,
            progress: Arc::new(IndicatifProgress::default()),
        },
        ImportWorkerPoolConfig {
            max_workers: workers,
        },
    );

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|runtime_error| {
            Error::internal(format!("failed to start async runtime: {runtime_error}"))
        })?;
    let report = runtime.block_on(service.run(request))?;

    info!(
        input = %report.input.display(),
        nothing_to_do = report.status == MigrationStatus::NothingToDo,
        "migration finished"
    );
    Ok(())
}

fn diesel_record_source(
    database: DatabaseSettings,
    connection_timeout: Duration,
) -> DieselRecordSource {
    let supplied = database.password;
    DieselRecordSource::new(DiscoveryTarget {
        host: database.host,
        port: database.port,
        name: database.name,
        user: database.user,
        password: Box::new(move || {
            resolve_secret(
                supplied.clone(),
                "Database password",
                "database-password",
                |label| TerminalPrompt.secret(label),
            )
            .map_err(|error| RecordSourceError::credentials(error.message()))
        }),
        shape: database.shape,
        connection_timeout,
    })
}

fn working_directory() -> Result<Utf8PathBuf, Error> {
    let current = std::env::current_dir().map_err(|io_error| {
        Error::invalid_input(format!("cannot resolve working directory: {io_error}"))
    })?;
    Utf8PathBuf::from_path_buf(current).map_err(|path| {
        Error::invalid_input(format!(
            "working directory '{}' is not valid UTF-8",
            path.display()
        ))
    })
}
