//! Behaviour tests for a whole migration run.
//!
//! The identity server and database are scripted doubles; record caches, logs,
//! and retry files are written to a temporary directory by the real file
//! adapters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use serde_json::json;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use usermigrate::domain::ports::{CacheReusePrompt, PromptError};
use usermigrate::domain::{
    CacheReuse, Error, ErrorCode, ImportWorkerPoolConfig, MigrationPorts, MigrationReport,
    MigrationRequest, MigrationService, ObjectKind, Record,
};
use usermigrate::outbound::record_files::{FileImportJournal, FileRecordCache};
use usermigrate::test_support::import_doubles::{
    CountingProgress, RecordingReporter, StubAdminApi, StubRecordSource,
};

struct DeclinePrompt;

impl CacheReusePrompt for DeclinePrompt {
    fn confirm_reuse(&self, _cache_path: &Path) -> Result<bool, PromptError> {
        Ok(false)
    }
}

#[derive(Clone)]
struct Workspace(Arc<TempDir>);

impl Workspace {
    fn new() -> Self {
        Self(Arc::new(tempfile::tempdir().expect("temp dir")))
    }

    fn base(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.0.path().to_path_buf()).expect("utf-8 temp dir")
    }

    fn write_records(&self, name: &str, records: &[Record]) -> PathBuf {
        let lines: Vec<String> = records.iter().map(ToString::to_string).collect();
        let path = self.0.path().join(name);
        std::fs::write(&path, lines.join("\n")).expect("write record file");
        path
    }

    fn read_records(&self, name: &str) -> Vec<Record> {
        let path = self.0.path().join(name);
        if !path.exists() {
            return Vec::new();
        }
        std::fs::read_to_string(path)
            .expect("read record file")
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("record line"))
            .collect()
    }
}

/// How the scripted identity server should behave.
#[derive(Clone, Default)]
struct ServerScript {
    existing: Vec<(ObjectKind, String)>,
    failing: Vec<String>,
    reject_from_call: Option<usize>,
}

impl ServerScript {
    fn build(&self) -> StubAdminApi {
        let mut api = StubAdminApi::new();
        for (kind, name) in &self.existing {
            api = api.with_existing(*kind, name);
        }
        for name in &self.failing {
            api = api.with_failing(name);
        }
        if let Some(call) = self.reject_from_call {
            api = api.rejecting_from_call(call);
        }
        api
    }
}

#[derive(Default, ScenarioState)]
struct MigrationWorld {
    workspace: Slot<Workspace>,
    server: Slot<ServerScript>,
    admin_api: Slot<Arc<StubAdminApi>>,
    users: Slot<Vec<Record>>,
    input_file: Slot<PathBuf>,
    reporter: Slot<Arc<RecordingReporter>>,
    result: Slot<Result<MigrationReport, Error>>,
}

impl MigrationWorld {
    fn workspace(&self) -> Workspace {
        if let Some(workspace) = self.workspace.get() {
            return workspace;
        }
        let workspace = Workspace::new();
        self.workspace.set(workspace.clone());
        workspace
    }

    fn script_server(&self, change: impl FnOnce(&mut ServerScript)) {
        let mut script = self.server.get().unwrap_or_default();
        change(&mut script);
        self.server.set(script);
    }

    fn run(&self, admin_api: StubAdminApi, request: MigrationRequest) {
        let workspace = self.workspace();
        let admin_api = Arc::new(admin_api);
        self.admin_api.set(Arc::clone(&admin_api));
        let reporter = Arc::new(RecordingReporter::default());
        let service = MigrationService::new(
            MigrationPorts {
                admin_api,
                record_source: Arc::new(StubRecordSource::returning(
                    self.users.get().unwrap_or_default(),
                )),
                record_cache: Arc::new(FileRecordCache::new(workspace.base())),
                journal: Arc::new(FileImportJournal::new(workspace.base())),
                prompt: Arc::new(DeclinePrompt),
                reporter: reporter.clone(),
                progress: Arc::new(CountingProgress::default()),
            },
            ImportWorkerPoolConfig { max_workers: 4 },
        );

        let runtime = Runtime::new().expect("create runtime");
        let result = runtime.block_on(service.run(request));
        self.reporter.set(reporter);
        self.result.set(result);
    }

    fn report(&self) -> MigrationReport {
        self.result
            .get()
            .expect("run result should be set")
            .expect("run should complete")
    }

    fn announced(&self, needle: &str) -> bool {
        self.reporter
            .get()
            .expect("reporter should be set")
            .mentions(needle)
    }
}

fn user(name: &str, groups: &str) -> Record {
    let groups: Vec<&str> = groups
        .split(',')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .collect();
    serde_json::from_value(json!({"username": name, "groups": groups})).expect("object")
}

#[fixture]
fn world() -> MigrationWorld {
    MigrationWorld::default()
}

#[given("discovered users {first} in {first_groups} and {second} in {second_groups}")]
fn discovered_users(
    world: &MigrationWorld,
    first: String,
    first_groups: String,
    second: String,
    second_groups: String,
) {
    let unquote = |value: &str| value.trim_matches('"').to_owned();
    world.users.set(vec![
        user(&unquote(&first), &unquote(&first_groups)),
        user(&unquote(&second), &unquote(&second_groups)),
    ]);
}

#[given("a user file holding a record with only groups {groups}")]
fn a_user_file_with_a_nameless_record(world: &MigrationWorld, groups: String) {
    let record: Record =
        serde_json::from_value(json!({"groups": [groups.trim_matches('"')]})).expect("object");
    let path = world.workspace().write_records("input", &[record]);
    world.input_file.set(path);
}

#[given("a user file holding {count} users without groups")]
fn a_user_file_with_plain_users(world: &MigrationWorld, count: usize) {
    let records: Vec<Record> = (0..count)
        .map(|index| {
            serde_json::from_value(json!({"username": format!("u{index}")})).expect("object")
        })
        .collect();
    let path = world.workspace().write_records("input", &records);
    world.input_file.set(path);
}

#[given("the server already has user {name}")]
fn the_server_already_has_user(world: &MigrationWorld, name: String) {
    let name = name.trim_matches('"').to_owned();
    world.script_server(|script| script.existing.push((ObjectKind::User, name)));
}

#[given("the server rejects credentials from create call {call}")]
fn the_server_rejects_credentials(world: &MigrationWorld, call: usize) {
    world.script_server(|script| script.reject_from_call = Some(call));
}

#[given("the server fails every call for user {name}")]
fn the_server_fails_every_call(world: &MigrationWorld, name: String) {
    let name = name.trim_matches('"').to_owned();
    world.script_server(|script| script.failing.push(name));
}

#[given("the server fails every call for group {name}")]
fn the_server_fails_every_group_call(world: &MigrationWorld, name: String) {
    let name = name.trim_matches('"').to_owned();
    world.script_server(|script| script.failing.push(name));
}

#[when("the migration runs")]
fn the_migration_runs(world: &MigrationWorld) {
    let admin_api = world.server.get().unwrap_or_default().build();
    world.run(
        admin_api,
        MigrationRequest {
            input_file: world.input_file.get(),
            input_kind: ObjectKind::User,
            cache_reuse: CacheReuse::Rediscover,
        },
    );
}

#[when("the user retry cache is fed back in against a recovered server")]
fn the_retry_cache_is_fed_back(world: &MigrationWorld) {
    let workspace = world.workspace();
    let retried = workspace.read_records("user_retry_cache");
    assert_eq!(retried.len(), 1, "only the failed user is queued");
    let input = workspace.write_records("retry_input", &retried);

    let recovered = StubAdminApi::new()
        .with_existing(ObjectKind::Group, "g1")
        .with_existing(ObjectKind::Group, "g2")
        .with_existing(ObjectKind::User, "a");
    world.run(
        recovered,
        MigrationRequest {
            input_file: Some(input),
            input_kind: ObjectKind::User,
            cache_reuse: CacheReuse::Rediscover,
        },
    );
}

#[when("the group rerun hint is followed against a recovered server")]
fn the_group_rerun_hint_is_followed(world: &MigrationWorld) {
    let summary = world.report().groups.expect("group pass ran").summary();
    let hint = summary
        .split_once("Rerun with '")
        .and_then(|(_, rest)| rest.split_once('\''))
        .map(|(flags, _)| flags.to_owned())
        .expect("group summary should carry a rerun hint");

    // Unset flags keep their command-line defaults.
    let mut request = MigrationRequest {
        input_file: None,
        input_kind: ObjectKind::User,
        cache_reuse: CacheReuse::Rediscover,
    };
    let mut flags = hint.split_whitespace();
    while let Some(flag) = flags.next() {
        let value = flags.next().expect("every flag takes a value");
        match flag {
            "--file-input" => request.input_file = Some(PathBuf::from(value)),
            "--input-kind" => request.input_kind = value.parse().expect("object kind"),
            other => panic!("unexpected flag in rerun hint: {other}"),
        }
    }
    world.run(StubAdminApi::new(), request);
}

#[then("the run completes")]
fn the_run_completes(world: &MigrationWorld) {
    let _report = world.report();
}

#[then("groups {groups} are created before any user")]
fn groups_are_created_before_users(world: &MigrationWorld, groups: String) {
    let expected: Vec<String> = groups
        .trim_matches('"')
        .split(',')
        .map(str::to_owned)
        .collect();
    let created = world.admin_api.get().expect("admin api").created();
    let first_user = created
        .iter()
        .position(|(kind, _)| *kind == ObjectKind::User)
        .expect("users were created");
    let mut created_groups: Vec<String> = created
        .iter()
        .take(first_user)
        .map(|(_, name)| name.clone())
        .collect();
    created_groups.sort();
    assert_eq!(created_groups, expected);
    assert!(
        created
            .iter()
            .skip(first_user)
            .all(|(kind, _)| *kind == ObjectKind::User)
    );
}

#[then("the run announces {message}")]
fn the_run_announces(world: &MigrationWorld, message: String) {
    let message = message.trim_matches('"');
    assert!(world.announced(message), "missing announcement: {message}");
}

#[then("the user summary mentions {count} skipped objects")]
fn the_user_summary_mentions_skipped(world: &MigrationWorld, count: usize) {
    let report = world.report();
    let users = report.users.expect("user pass ran");
    assert_eq!(users.tally.skipped, count);
    assert!(users.summary().contains(&format!(
        "{count} user objects were skipped because their name field was missing or blank."
    )));
}

#[then("the user summary mentions {count} existing objects")]
fn the_user_summary_mentions_existing(world: &MigrationWorld, count: usize) {
    let report = world.report();
    let users = report.users.expect("user pass ran");
    assert_eq!(users.tally.exists, count);
    assert!(users.summary().contains(&format!(
        "{count} user objects were already on the server and did not get overwritten."
    )));
}

#[then("the user retry cache holds {count} records")]
fn the_user_retry_cache_holds(world: &MigrationWorld, count: usize) {
    let retried = world.workspace().read_records("user_retry_cache");
    assert_eq!(retried.len(), count);
}

#[then("only group {name} was created")]
fn only_group_was_created(world: &MigrationWorld, name: String) {
    let created = world.admin_api.get().expect("admin api").created();
    assert_eq!(
        created,
        vec![(ObjectKind::Group, name.trim_matches('"').to_owned())]
    );
}

#[then("the user retry cache still holds user {name}")]
fn the_user_retry_cache_still_holds(world: &MigrationWorld, name: String) {
    let names: Vec<Option<String>> = world
        .workspace()
        .read_records("user_retry_cache")
        .iter()
        .map(|record| record.name(ObjectKind::User))
        .collect();
    assert_eq!(names, vec![Some(name.trim_matches('"').to_owned())]);
}

#[then("the run aborts with an authentication error")]
fn the_run_aborts_with_authentication(world: &MigrationWorld) {
    let Some(Err(error)) = world.result.get() else {
        panic!("run should abort");
    };
    assert_eq!(error.code(), ErrorCode::Authentication);
    assert!(
        !world.announced("user objects. There were"),
        "an aborted pass must not announce a summary"
    );
}

#[then("fewer than {count} create calls were made")]
fn fewer_create_calls(world: &MigrationWorld, count: usize) {
    let calls = world.admin_api.get().expect("admin api").create_calls();
    assert!(calls < count, "{calls} create calls were made");
}

#[then("the admin session was closed")]
fn the_admin_session_was_closed(world: &MigrationWorld) {
    let events = world.admin_api.get().expect("admin api").events();
    assert_eq!(events.last().map(String::as_str), Some("close_session"));
}

#[scenario(path = "tests/features/migration_run.feature")]
fn migration_run_scenarios(world: MigrationWorld) {
    drop(world);
}
