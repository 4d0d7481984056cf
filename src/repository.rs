//! Cache-aside employee repository.
//!
//! Reads are answered from the local store immediately. Every read also
//! kicks off a background refresh against the remote directory, and the
//! refreshed rows land in the store, where open live queries pick them up.
//! Refresh failures never reach the caller: they go to the [`ErrorSink`].

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{RosterConfig, StoreLocation};
use crate::employee::Employee;
use crate::error::{Result, SyncError};
use crate::memory::MemoryStore;
use crate::remote::{HttpDirectory, RemoteDirectory};
use crate::report::{ErrorSink, TracingSink};
use crate::sqlite::SqliteStore;
use crate::store::EmployeeStore;
use crate::watch::LiveQuery;

/// One shared repository per backing store.
///
/// The lock is held across construction, so racing callers for the same
/// location block until the first finishes and then receive its instance.
static REGISTRY: Lazy<Mutex<HashMap<StoreLocation, Arc<EmployeeRepository>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Cache-aside repository over a local [`EmployeeStore`] and a remote
/// [`RemoteDirectory`].
///
/// Cloning is cheap and clones share the same store, directory, and sink.
#[derive(Clone)]
pub struct EmployeeRepository {
    store: Arc<dyn EmployeeStore>,
    remote: Arc<dyn RemoteDirectory>,
    sink: Arc<dyn ErrorSink>,
}

impl EmployeeRepository {
    /// Wire a repository from its parts, reporting failures via
    /// [`TracingSink`].
    pub fn new(store: Arc<dyn EmployeeStore>, remote: Arc<dyn RemoteDirectory>) -> Self {
        Self::with_sink(store, remote, Arc::new(TracingSink))
    }

    /// Wire a repository with an explicit failure sink.
    pub fn with_sink(
        store: Arc<dyn EmployeeStore>,
        remote: Arc<dyn RemoteDirectory>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self { store, remote, sink }
    }

    /// Open a repository from configuration, bypassing the registry.
    pub async fn open(config: &RosterConfig) -> Result<Self> {
        let store: Arc<dyn EmployeeStore> = match &config.store {
            StoreLocation::InMemory => Arc::new(MemoryStore::new()),
            StoreLocation::Sqlite(path) => Arc::new(SqliteStore::open(path).await?),
        };
        let remote: Arc<dyn RemoteDirectory> = Arc::new(HttpDirectory::new(&config.remote)?);

        info!("Employee repository ready for {:?}", config.store);
        Ok(Self::new(store, remote))
    }

    /// Get or create the shared repository for the config's store location.
    ///
    /// The backing store is opened exactly once per location, no matter how
    /// many callers race here. A failed construction leaves the registry
    /// untouched, so a later call can retry.
    pub async fn shared(config: &RosterConfig) -> Result<Arc<Self>> {
        let mut registry = REGISTRY.lock().await;
        if let Some(existing) = registry.get(&config.store) {
            return Ok(Arc::clone(existing));
        }

        let repository = Arc::new(Self::open(config).await?);
        registry.insert(config.store.clone(), Arc::clone(&repository));
        Ok(repository)
    }

    /// Live view of the whole roster.
    ///
    /// Returns the local rows immediately and schedules a remote refresh on
    /// the runtime; the handle emits again once refreshed rows land. Must be
    /// called within a Tokio runtime.
    pub async fn all_employees(&self) -> Result<LiveQuery<Vec<Employee>>> {
        let query = self.store.watch_all().await?;

        let this = self.clone();
        tokio::spawn(async move { this.refresh_all().await });
        Ok(query)
    }

    /// Live view of a single employee.
    ///
    /// Same contract as [`all_employees`](Self::all_employees): local answer
    /// first, background refresh after.
    pub async fn employee_by_id(&self, id: u32) -> Result<LiveQuery<Option<Employee>>> {
        let query = self.store.watch_by_id(id).await?;

        let this = self.clone();
        tokio::spawn(async move { this.refresh_by_id(id).await });
        Ok(query)
    }

    /// Fetch the full roster from the directory and reconcile it into the
    /// local store. Absorbs every failure into the sink.
    pub async fn refresh_all(&self) {
        debug!("Refreshing employee roster");
        match self.remote.fetch_all().await {
            Ok(roster) => self.reconcile(roster).await,
            Err(e) => self.sink.report("fetch-all", &e),
        }
    }

    /// Fetch one employee from the directory and reconcile it into the
    /// local store. Absorbs every failure into the sink; an id the
    /// directory does not know leaves the local record untouched.
    pub async fn refresh_by_id(&self, id: u32) {
        debug!("Refreshing employee {}", id);
        match self.remote.fetch_by_id(id).await {
            Ok(employee) if employee.id == id => {
                if let Err(e) = self.store.upsert(employee).await {
                    self.sink.report("reconcile", &e);
                }
            }
            Ok(employee) => {
                let err = SyncError::Protocol(format!(
                    "asked for employee {} but the directory answered with {}",
                    id, employee.id
                ));
                self.sink.report("fetch-by-id", &err);
            }
            Err(e) => self.sink.report("fetch-by-id", &e),
        }
    }

    /// Remove an employee from the local store.
    ///
    /// The remote directory is read-only from here; a later refresh may
    /// bring the record back if the directory still has it.
    pub async fn delete(&self, id: u32) -> Result<()> {
        self.store.delete(id).await
    }

    async fn reconcile(&self, roster: Vec<Employee>) {
        debug!("Reconciling {} employees into the local store", roster.len());
        for employee in roster {
            if let Err(e) = self.store.upsert(employee).await {
                self.sink.report("reconcile", &e);
                return;
            }
        }
    }
}
