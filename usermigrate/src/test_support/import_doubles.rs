//! Shared port doubles for import worker and orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{
    AdminApiError, IdentityAdminApi, ImportJournal, ImportJournalError, ImportProgress,
    JournalLocations, RecordSource, RecordSourceError, RunReporter,
};
use crate::domain::{ObjectKind, Record};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex poisoned"),
    }
}

/// Scripted admin API that remembers every call.
///
/// Objects are created unless their name is listed as existing or failing.
/// When `reject_from_call` is set, that call and every later one fail with
/// rejected credentials.
#[derive(Default)]
pub struct StubAdminApi {
    existing: Mutex<HashSet<(ObjectKind, String)>>,
    failing: HashSet<String>,
    reject_from_call: Option<usize>,
    unreachable: bool,
    latency: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    created: Mutex<Vec<(ObjectKind, String)>>,
    events: Mutex<Vec<String>>,
}

impl StubAdminApi {
    /// A server that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as already present for `kind`.
    pub fn with_existing(self, kind: ObjectKind, name: &str) -> Self {
        lock(&self.existing, "existing").insert((kind, name.to_owned()));
        self
    }

    /// Fail every create call for `name` with a server error.
    pub fn with_failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_owned());
        self
    }

    /// Reject credentials from the `call`-th create call onwards (1-based).
    pub fn rejecting_from_call(mut self, call: usize) -> Self {
        self.reject_from_call = Some(call);
        self
    }

    /// Fail the connection check.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Hold every create call open for `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of create calls received.
    pub fn create_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of create calls observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Objects created so far, in completion order.
    pub fn created(&self) -> Vec<(ObjectKind, String)> {
        lock(&self.created, "created").clone()
    }

    /// Session and pass events in call order, for example `open_session` or
    /// `create group g1`.
    pub fn events(&self) -> Vec<String> {
        lock(&self.events, "events").clone()
    }

    fn push_event(&self, event: String) {
        lock(&self.events, "events").push(event);
    }
}

#[async_trait]
impl IdentityAdminApi for StubAdminApi {
    async fn check_connection(&self) -> Result<(), AdminApiError> {
        self.push_event("check_connection".to_owned());
        if self.unreachable {
            return Err(AdminApiError::connection("connection refused"));
        }
        Ok(())
    }

    async fn open_session(&self) -> Result<(), AdminApiError> {
        self.push_event("open_session".to_owned());
        Ok(())
    }

    async fn close_session(&self) -> Result<(), AdminApiError> {
        self.push_event("close_session".to_owned());
        Ok(())
    }

    async fn create_object(&self, kind: ObjectKind, record: &Record) -> Result<(), AdminApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let name = record.name(kind).unwrap_or_default();
        self.push_event(format!("create {kind} {name}"));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reject_from_call.is_some_and(|first| call >= first) {
            return Err(AdminApiError::authentication("401 Unauthorized"));
        }
        if self.failing.contains(&name) {
            return Err(AdminApiError::communication("500 Internal Server Error"));
        }
        if !lock(&self.existing, "existing").insert((kind, name.clone())) {
            return Err(AdminApiError::conflict(format!("{kind} {name}")));
        }
        lock(&self.created, "created").push((kind, name));
        Ok(())
    }
}

/// In-memory journal keyed by object kind.
#[derive(Default)]
pub struct MemoryJournal {
    logs: Mutex<HashMap<ObjectKind, Vec<String>>>,
    retries: Mutex<HashMap<ObjectKind, Vec<Record>>>,
    passes: Mutex<Vec<ObjectKind>>,
    fail_writes: bool,
}

impl MemoryJournal {
    /// A journal that accepts every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// A journal whose log and retry writes always fail.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Log lines written for `kind`.
    pub fn log_lines(&self, kind: ObjectKind) -> Vec<String> {
        lock(&self.logs, "logs")
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Records queued for retry for `kind`.
    pub fn retries(&self, kind: ObjectKind) -> Vec<Record> {
        lock(&self.retries, "retries")
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Kinds whose pass was started, in order.
    pub fn passes(&self) -> Vec<ObjectKind> {
        lock(&self.passes, "passes").clone()
    }

    fn check_writable(&self) -> Result<(), ImportJournalError> {
        if self.fail_writes {
            return Err(ImportJournalError::write("disk full"));
        }
        Ok(())
    }
}

impl ImportJournal for MemoryJournal {
    fn begin_pass(&self, kind: ObjectKind) -> Result<JournalLocations, ImportJournalError> {
        lock(&self.passes, "passes").push(kind);
        let removed_previous_log = lock(&self.logs, "logs").remove(&kind).is_some();
        let removed_previous_retry_cache = lock(&self.retries, "retries").remove(&kind).is_some();
        Ok(JournalLocations {
            log: PathBuf::from(format!("/journal/{kind}_import.log")),
            retry_cache: PathBuf::from(format!("/journal/{kind}_retry_cache")),
            removed_previous_log,
            removed_previous_retry_cache,
        })
    }

    fn log(&self, kind: ObjectKind, message: &str) -> Result<(), ImportJournalError> {
        self.check_writable()?;
        lock(&self.logs, "logs")
            .entry(kind)
            .or_default()
            .push(message.to_owned());
        Ok(())
    }

    fn queue_retry(&self, kind: ObjectKind, record: &Record) -> Result<(), ImportJournalError> {
        self.check_writable()?;
        lock(&self.retries, "retries")
            .entry(kind)
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

/// Reporter that keeps every announcement.
#[derive(Default)]
pub struct RecordingReporter(Mutex<Vec<String>>);

impl RecordingReporter {
    /// Announcements so far.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.0, "reporter").clone()
    }

    /// Whether any announcement contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.messages().iter().any(|message| message.contains(needle))
    }
}

impl RunReporter for RecordingReporter {
    fn announce(&self, message: &str) {
        lock(&self.0, "reporter").push(message.to_owned());
    }
}

/// Progress double counting advances.
#[derive(Default)]
pub struct CountingProgress {
    advances: AtomicUsize,
    started: Mutex<Vec<(ObjectKind, usize)>>,
}

impl CountingProgress {
    /// Number of resolved records reported.
    pub fn advances(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    /// Passes started, with their totals.
    pub fn started(&self) -> Vec<(ObjectKind, usize)> {
        lock(&self.started, "progress").clone()
    }
}

impl ImportProgress for CountingProgress {
    fn start(&self, kind: ObjectKind, total: usize) {
        lock(&self.started, "progress").push((kind, total));
    }

    fn advance(&self) {
        self.advances.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {}
}

/// Record source returning a fixed set of users.
pub struct StubRecordSource {
    users: Result<Vec<Record>, RecordSourceError>,
    calls: AtomicUsize,
}

impl StubRecordSource {
    /// Discover `users`.
    pub fn returning(users: Vec<Record>) -> Self {
        Self {
            users: Ok(users),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail discovery with `error`.
    pub fn failing(error: RecordSourceError) -> Self {
        Self {
            users: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of discovery runs.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for StubRecordSource {
    async fn discover_users(&self) -> Result<Vec<Record>, RecordSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.users.clone()
    }
}

/// Name every record in `records` as `kind`, skipping unnamed ones.
pub fn names(records: &[Record], kind: ObjectKind) -> Vec<String> {
    records.iter().filter_map(|record| record.name(kind)).collect()
}
