//! Batch orchestration for one migration run.
//!
//! A run walks `connect → discover or load → derive groups → import groups →
//! import users → report`. Groups are imported first so users can be placed in
//! them; a partially failed group pass never blocks the user pass. Any error
//! returned from [`MigrationService::run`] names the stage that aborted.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::domain::import_worker_pool::{
    ImportWorkerPool, ImportWorkerPoolConfig, ImportWorkerPoolPorts,
};
use crate::domain::ports::{
    AdminApiError, CacheReusePrompt, IdentityAdminApi, PromptError, RecordCache,
    RecordCacheError, RecordSource, RecordSourceError, RunReporter,
};
use crate::domain::{BatchReport, Error, ObjectKind, Record, derive_groups};

mod ports;

pub use ports::MigrationPorts;

/// Stages of a migration run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Probe the identity server.
    Connect,
    /// Resolve the input file, discovering records when needed.
    DiscoverOrLoad,
    /// Build group records from user memberships.
    DeriveGroups,
    /// Import the group batch.
    ImportGroups,
    /// Import the user batch.
    ImportUsers,
    /// Summarise the run.
    Report,
}

impl RunStage {
    /// Human-readable stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::DiscoverOrLoad => "discover or load",
            Self::DeriveGroups => "derive groups",
            Self::ImportGroups => "import groups",
            Self::ImportUsers => "import users",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to treat a discovery cache left by an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheReuse {
    /// Ask the operator.
    #[default]
    Ask,
    /// Reuse it without asking.
    Reuse,
    /// Discard it and discover again.
    Rediscover,
}

impl From<Option<bool>> for CacheReuse {
    fn from(answer: Option<bool>) -> Self {
        match answer {
            None => Self::Ask,
            Some(true) => Self::Reuse,
            Some(false) => Self::Rediscover,
        }
    }
}

/// Parameters of one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    /// Explicit record file to import instead of discovering.
    pub input_file: Option<PathBuf>,
    /// Kind of records held by the input.
    pub input_kind: ObjectKind,
    /// Treatment of an existing discovery cache.
    pub cache_reuse: CacheReuse,
}

impl Default for MigrationRequest {
    fn default() -> Self {
        Self {
            input_file: None,
            input_kind: ObjectKind::User,
            cache_reuse: CacheReuse::Ask,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Every planned pass ran.
    Completed,
    /// The input held no records, so nothing was sent.
    NothingToDo,
}

/// Result of a migration run that did not abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// How the run ended.
    pub status: MigrationStatus,
    /// File the records were read from.
    pub input: PathBuf,
    /// Group pass result, when one ran.
    pub groups: Option<BatchReport>,
    /// User pass result, when one ran.
    pub users: Option<BatchReport>,
}

struct ImportPlan {
    groups: Vec<Record>,
    users: Option<Vec<Record>>,
}

/// Domain service driving a whole migration run.
pub struct MigrationService {
    admin_api: Arc<dyn IdentityAdminApi>,
    record_source: Arc<dyn RecordSource>,
    record_cache: Arc<dyn RecordCache>,
    prompt: Arc<dyn CacheReusePrompt>,
    reporter: Arc<dyn RunReporter>,
    pool: ImportWorkerPool,
}

impl MigrationService {
    /// Build the service over `ports`.
    pub fn new(ports: MigrationPorts, pool_config: ImportWorkerPoolConfig) -> Self {
        let MigrationPorts {
            admin_api,
            record_source,
            record_cache,
            journal,
            prompt,
            reporter,
            progress,
        } = ports;
        let pool = ImportWorkerPool::new(
            ImportWorkerPoolPorts::new(
                Arc::clone(&admin_api),
                journal,
                Arc::clone(&reporter),
                progress,
            ),
            pool_config,
        );
        Self {
            admin_api,
            record_source,
            record_cache,
            prompt,
            reporter,
            pool,
        }
    }

    /// Execute one migration run.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] whose code identifies the cause and whose message
    /// names the aborted [`RunStage`]. Per-record failures never abort a run;
    /// they are reported in the pass summaries instead.
    ///
    /// ```rust,ignore
    /// let report = service.run(MigrationRequest::default()).await?;
    /// assert_eq!(report.status, MigrationStatus::Completed);
    /// # Ok::<(), usermigrate::domain::Error>(())
    /// ```
    pub async fn run(&self, request: MigrationRequest) -> Result<MigrationReport, Error> {
        self.connect()
            .await
            .map_err(|error| error.in_stage(RunStage::Connect))?;

        let (input, records) = self
            .discover_or_load(&request)
            .await
            .map_err(|error| error.in_stage(RunStage::DiscoverOrLoad))?;

        if records.is_empty() {
            self.reporter.announce("No users found.\nNothing to do.");
            info!(input = %input.display(), "input holds no records");
            return Ok(MigrationReport {
                status: MigrationStatus::NothingToDo,
                input,
                groups: None,
                users: None,
            });
        }

        let plan = self.plan(request.input_kind, records);

        self.reporter.announce("Starting import...");
        self.admin_api
            .open_session()
            .await
            .map_err(|error| map_admin_error(error).in_stage(RunStage::ImportGroups))?;

        let passes = self.import(plan).await;

        if let Err(error) = self.admin_api.close_session().await {
            warn!(error = %error, "failed to close admin session");
        }
        let (groups, users) = passes?;

        info!(
            stage = %RunStage::Report,
            groups_loaded = groups.as_ref().map_or(0, |report| report.tally.loaded),
            users_loaded = users.as_ref().map_or(0, |report| report.tally.loaded),
            "migration run completed"
        );
        Ok(MigrationReport {
            status: MigrationStatus::Completed,
            input,
            groups,
            users,
        })
    }

    async fn connect(&self) -> Result<(), Error> {
        info!(stage = %RunStage::Connect, "checking identity server");
        self.admin_api
            .check_connection()
            .await
            .map_err(map_admin_error)
    }

    fn plan(&self, input_kind: ObjectKind, records: Vec<Record>) -> ImportPlan {
        match input_kind {
            ObjectKind::User => {
                self.reporter.announce("Parsing groups from users...");
                let groups = derive_groups(&records);
                self.reporter.announce(&format!(
                    "{} users and {} unique groups found.",
                    records.len(),
                    groups.len()
                ));
                info!(
                    stage = %RunStage::DeriveGroups,
                    users = records.len(),
                    groups = groups.len(),
                    "groups derived"
                );
                ImportPlan {
                    groups,
                    users: Some(records),
                }
            }
            ObjectKind::Group => {
                self.reporter
                    .announce(&format!("{} groups found.", records.len()));
                ImportPlan {
                    groups: records,
                    users: None,
                }
            }
        }
    }

    async fn import(
        &self,
        plan: ImportPlan,
    ) -> Result<(Option<BatchReport>, Option<BatchReport>), Error> {
        let groups = self
            .pool
            .run_pass(ObjectKind::Group, plan.groups)
            .await
            .map_err(|error| error.in_stage(RunStage::ImportGroups))?;

        let users = match plan.users {
            Some(users) => Some(
                self.pool
                    .run_pass(ObjectKind::User, users)
                    .await
                    .map_err(|error| error.in_stage(RunStage::ImportUsers))?,
            ),
            None => None,
        };
        Ok((Some(groups), users))
    }

    async fn discover_or_load(
        &self,
        request: &MigrationRequest,
    ) -> Result<(PathBuf, Vec<Record>), Error> {
        let input = self.resolve_input(request).await?;
        let records = self
            .record_cache
            .load(&input)
            .map_err(|error| map_load_error(&input, error))?;
        info!(
            stage = %RunStage::DiscoverOrLoad,
            input = %input.display(),
            records = records.len(),
            "records loaded"
        );
        Ok((input, records))
    }

    async fn resolve_input(&self, request: &MigrationRequest) -> Result<PathBuf, Error> {
        if let Some(path) = &request.input_file {
            if path.as_os_str().is_empty() {
                return Err(Error::invalid_input("input file path is empty"));
            }
            self.reporter
                .announce(&format!("Using records from {}.", path.display()));
            return Ok(path.clone());
        }
        if request.input_kind == ObjectKind::Group {
            return Err(Error::invalid_input(
                "group input requires an input file; discovery only finds users",
            ));
        }

        let cache_path = self.record_cache.discovery_cache_path();
        if self.record_cache.discovery_cache_exists() {
            self.reporter
                .announce(&format!("Found cached users at {}.", cache_path.display()));
            if self.should_reuse(request.cache_reuse, &cache_path)? {
                return Ok(cache_path);
            }
            self.reporter.announce("Rediscovering.");
        }

        self.discover_into_cache(&cache_path).await?;
        Ok(cache_path)
    }

    fn should_reuse(&self, policy: CacheReuse, cache_path: &Path) -> Result<bool, Error> {
        match policy {
            CacheReuse::Reuse => Ok(true),
            CacheReuse::Rediscover => Ok(false),
            CacheReuse::Ask => self
                .prompt
                .confirm_reuse(cache_path)
                .map_err(|error| map_prompt_error(cache_path, error)),
        }
    }

    async fn discover_into_cache(&self, cache_path: &Path) -> Result<(), Error> {
        if self
            .record_cache
            .clear_discovery_cache()
            .map_err(|error| Error::storage(error.to_string()))?
        {
            self.reporter.announce("Removing old cache.");
        }

        self.reporter
            .announce("Discovering users from the database...");
        let started = Instant::now();
        let discovered = self.fill_discovery_cache().await;
        if let Err(error) = discovered {
            self.reporter.announce("Cleaning up failed cache");
            if let Err(cleanup) = self.record_cache.clear_discovery_cache() {
                warn!(error = %cleanup, "failed to remove partial discovery cache");
            }
            return Err(error);
        }

        self.reporter.announce(&format!(
            "Database query completed in {} seconds.",
            started.elapsed().as_secs()
        ));
        self.reporter
            .announce(&format!("Created user cache at {}", cache_path.display()));
        Ok(())
    }

    async fn fill_discovery_cache(&self) -> Result<(), Error> {
        let users = self
            .record_source
            .discover_users()
            .await
            .map_err(map_source_error)?;
        for user in &users {
            self.record_cache
                .append_to_discovery_cache(user)
                .map_err(|error| Error::storage(error.to_string()))?;
        }
        info!(users = users.len(), "discovery cache written");
        Ok(())
    }
}

fn map_admin_error(error: AdminApiError) -> Error {
    match error {
        AdminApiError::Authentication { .. } => Error::authentication(error.to_string()),
        AdminApiError::Connection { .. }
        | AdminApiError::Conflict { .. }
        | AdminApiError::Communication { .. } => Error::connection(error.to_string()),
    }
}

fn map_source_error(error: RecordSourceError) -> Error {
    match error {
        RecordSourceError::Credentials { .. } => Error::invalid_input(error.to_string()),
        RecordSourceError::Connection { .. } | RecordSourceError::Query { .. } => {
            Error::discovery(error.to_string())
        }
    }
}

fn map_load_error(input: &Path, error: RecordCacheError) -> Error {
    Error::invalid_input(format!(
        "cannot load records from {}: {error}",
        input.display()
    ))
}

fn map_prompt_error(cache_path: &Path, error: PromptError) -> Error {
    match error {
        PromptError::NotInteractive => Error::invalid_input(format!(
            "a discovery cache exists at {}; pass --reuse-cache true or false when not \
             running in a terminal",
            cache_path.display()
        )),
        PromptError::Terminal { .. } => Error::invalid_input(error.to_string()),
    }
}
