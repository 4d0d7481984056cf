//! End-to-end cache-aside flows over the public API.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::timeout;
use tokio_stream::StreamExt;

use roster_sync::{
    CapturingSink, Employee, EmployeeRepository, EmployeeStore, LiveQuery, MemoryStore,
    RemoteDirectory, Result, RosterConfig, SqliteStore, SyncError,
};

fn staff(n: u32) -> Employee {
    Employee::new(n, format!("employee-{n}"), 1_000 * n, 20 + n)
}

/// Remote directory fake replaying queued answers.
#[derive(Default)]
struct FakeDirectory {
    all: Mutex<VecDeque<Result<Vec<Employee>>>>,
    one: Mutex<VecDeque<Result<Employee>>>,
}

impl FakeDirectory {
    fn answer_all(&self, response: Result<Vec<Employee>>) {
        self.all.lock().push_back(response);
    }

    fn answer_one(&self, response: Result<Employee>) {
        self.one.lock().push_back(response);
    }
}

#[async_trait]
impl RemoteDirectory for FakeDirectory {
    async fn fetch_all(&self) -> Result<Vec<Employee>> {
        self.all
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::Transport("no scripted answer".into())))
    }

    async fn fetch_by_id(&self, _id: u32) -> Result<Employee> {
        self.one
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::Transport("no scripted answer".into())))
    }
}

/// Remote directory fake that answers after a pause.
struct SlowDirectory {
    roster: Vec<Employee>,
    pause: Duration,
}

#[async_trait]
impl RemoteDirectory for SlowDirectory {
    async fn fetch_all(&self) -> Result<Vec<Employee>> {
        tokio::time::sleep(self.pause).await;
        Ok(self.roster.clone())
    }

    async fn fetch_by_id(&self, id: u32) -> Result<Employee> {
        tokio::time::sleep(self.pause).await;
        self.roster
            .iter()
            .find(|employee| employee.id == id)
            .cloned()
            .ok_or(SyncError::NotFound(id))
    }
}

/// Wait until the live roster converges on `want`. Intermediate snapshots
/// are fine; each reconciled row publishes one.
async fn wait_for_roster(query: &mut LiveQuery<Vec<Employee>>, want: &[Employee]) {
    timeout(Duration::from_secs(5), async {
        loop {
            let got = query.next().await.expect("store dropped");
            if got.as_slice() == want {
                return;
            }
        }
    })
    .await
    .expect("roster never converged");
}

#[tokio::test]
async fn roster_flow_serves_cache_then_refresh() {
    let store = Arc::new(MemoryStore::new());
    store.upsert(staff(1)).await.unwrap();

    let remote = Arc::new(FakeDirectory::default());
    remote.answer_all(Ok(vec![staff(1), staff(2)]));

    let repository = EmployeeRepository::new(store, remote);

    let mut roster = repository.all_employees().await.unwrap();
    assert_eq!(roster.current(), vec![staff(1)]);

    wait_for_roster(&mut roster, &[staff(1), staff(2)]).await;
}

#[tokio::test]
async fn failed_refresh_keeps_cache_and_handle() {
    let store = Arc::new(MemoryStore::new());
    store.upsert(staff(1)).await.unwrap();

    let remote = Arc::new(FakeDirectory::default());
    let sink = Arc::new(CapturingSink::new());
    let repository = EmployeeRepository::with_sink(
        Arc::clone(&store) as _,
        Arc::clone(&remote) as _,
        Arc::clone(&sink) as _,
    );

    remote.answer_all(Err(SyncError::Transport("dns failure".into())));

    let mut roster = repository.all_employees().await.unwrap();
    assert_eq!(roster.current(), vec![staff(1)]);

    // The failed refresh must not publish anything.
    assert!(timeout(Duration::from_millis(100), roster.next())
        .await
        .is_err());
    assert!(roster.is_live());

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "fetch-all");
    assert!(reports[0].1.contains("dns failure"));

    // The handle recovers as soon as a refresh succeeds.
    remote.answer_all(Ok(vec![staff(1), staff(2)]));
    repository.refresh_all().await;
    wait_for_roster(&mut roster, &[staff(1), staff(2)]).await;
}

#[tokio::test]
async fn lookup_of_unknown_id_leaves_record_absent() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeDirectory::default());
    let sink = Arc::new(CapturingSink::new());
    let repository = EmployeeRepository::with_sink(
        Arc::clone(&store) as _,
        Arc::clone(&remote) as _,
        Arc::clone(&sink) as _,
    );

    remote.answer_one(Err(SyncError::NotFound(42)));

    let mut tracked = repository.employee_by_id(42).await.unwrap();
    assert_eq!(tracked.current(), None);

    assert!(timeout(Duration::from_millis(100), tracked.next())
        .await
        .is_err());
    assert!(store.get(42).await.unwrap().is_none());

    let reports = sink.reports();
    assert_eq!(reports[0].0, "fetch-by-id");
    assert!(reports[0].1.contains("not found"));
}

#[tokio::test]
async fn failed_lookup_keeps_record_and_handle() {
    let store = Arc::new(MemoryStore::new());
    let old = Employee::new(1, "Old", 100, 30);
    store.upsert(old.clone()).await.unwrap();

    let remote = Arc::new(FakeDirectory::default());
    let sink = Arc::new(CapturingSink::new());
    let repository = EmployeeRepository::with_sink(
        Arc::clone(&store) as _,
        Arc::clone(&remote) as _,
        Arc::clone(&sink) as _,
    );

    remote.answer_one(Err(SyncError::Transport("connection reset".into())));

    let mut tracked = repository.employee_by_id(1).await.unwrap();
    assert_eq!(tracked.current(), Some(old.clone()));

    // The failed refresh must not publish or clear anything.
    assert!(timeout(Duration::from_millis(100), tracked.next())
        .await
        .is_err());
    assert!(tracked.is_live());
    assert_eq!(tracked.current(), Some(old.clone()));
    assert_eq!(store.get(1).await.unwrap(), Some(old));

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "fetch-by-id");
    assert!(reports[0].1.contains("connection reset"));

    // The handle recovers as soon as a lookup succeeds.
    let promoted = Employee::new(1, "promoted", 9_000, 31);
    remote.answer_one(Ok(promoted.clone()));
    repository.refresh_by_id(1).await;
    assert_eq!(tracked.next().await.unwrap(), Some(promoted));
}

#[tokio::test]
async fn tracked_employee_picks_up_remote_changes() {
    let store = Arc::new(MemoryStore::new());
    store.upsert(staff(5)).await.unwrap();

    let remote = Arc::new(FakeDirectory::default());
    let promoted = Employee::new(5, "promoted", 9_000, 30);
    remote.answer_one(Ok(promoted.clone()));

    let repository = EmployeeRepository::new(Arc::clone(&store) as _, remote);

    let mut tracked = repository.employee_by_id(5).await.unwrap();
    assert_eq!(tracked.current(), Some(staff(5)));
    assert_eq!(tracked.next().await.unwrap(), Some(promoted));
}

#[tokio::test]
async fn roster_handle_tracks_refresh_and_delete_cycles() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeDirectory::default());
    let repository = EmployeeRepository::new(Arc::clone(&store) as _, Arc::clone(&remote) as _);

    remote.answer_all(Ok(vec![staff(1)]));
    let mut roster = repository.all_employees().await.unwrap();
    wait_for_roster(&mut roster, &[staff(1)]).await;

    remote.answer_all(Ok(vec![staff(1), staff(2)]));
    repository.refresh_all().await;
    wait_for_roster(&mut roster, &[staff(1), staff(2)]).await;

    repository.delete(1).await.unwrap();
    wait_for_roster(&mut roster, &[staff(2)]).await;
}

#[tokio::test]
async fn cancelled_handle_leaves_refresh_running() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(SlowDirectory {
        roster: vec![staff(1), staff(2)],
        pause: Duration::from_millis(50),
    });
    let repository = EmployeeRepository::new(Arc::clone(&store) as _, remote);

    let roster = repository.all_employees().await.unwrap();
    roster.cancel();

    // The refresh started by the lookup still lands in the store.
    timeout(Duration::from_secs(5), async {
        loop {
            if store.get_all().await.unwrap() == vec![staff(1), staff(2)] {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("refresh never reconciled");
}

#[tokio::test]
async fn roster_stream_yields_current_then_updates() {
    let store = Arc::new(MemoryStore::new());
    store.upsert(staff(1)).await.unwrap();

    let remote = Arc::new(FakeDirectory::default());
    remote.answer_all(Ok(vec![staff(1)]));
    let repository = EmployeeRepository::new(Arc::clone(&store) as _, remote);

    let roster = repository.all_employees().await.unwrap();
    let mut stream = roster.into_stream();

    assert_eq!(stream.next().await.unwrap(), vec![staff(1)]);

    store.upsert(staff(2)).await.unwrap();
    assert_eq!(stream.next().await.unwrap(), vec![staff(1), staff(2)]);
}

#[tokio::test]
async fn sqlite_backend_runs_the_same_flow() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("roster.db")).await.unwrap());

    let remote = Arc::new(FakeDirectory::default());
    remote.answer_all(Ok(vec![staff(3), staff(1)]));

    let repository = EmployeeRepository::new(Arc::clone(&store) as _, remote);

    let mut roster = repository.all_employees().await.unwrap();
    assert_eq!(roster.current(), Vec::<Employee>::new());

    wait_for_roster(&mut roster, &[staff(1), staff(3)]).await;
}

#[tokio::test]
async fn sqlite_roster_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");

    {
        let store = SqliteStore::open(&path).await.unwrap();
        store.upsert(staff(1)).await.unwrap();
        store.upsert(staff(2)).await.unwrap();
        store.delete(2).await.unwrap();
    }

    let store = SqliteStore::open(&path).await.unwrap();
    assert_eq!(store.get_all().await.unwrap(), vec![staff(1)]);
}

#[tokio::test]
async fn shared_repository_is_one_instance_per_location() {
    let dir = tempfile::tempdir().unwrap();
    let config_a = RosterConfig::sqlite(dir.path().join("a.db"));
    let config_b = RosterConfig::sqlite(dir.path().join("b.db"));

    let (first, second) = tokio::join!(
        EmployeeRepository::shared(&config_a),
        EmployeeRepository::shared(&config_a),
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let other = EmployeeRepository::shared(&config_b).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
}
