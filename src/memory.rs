//! In-memory employee store.
//!
//! Not durable - data is lost on process exit. The persistent backend is
//! [`SqliteStore`](crate::sqlite::SqliteStore); this one backs tests,
//! development, and callers that only need the live-query machinery.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::employee::Employee;
use crate::error::Result;
use crate::store::EmployeeStore;
use crate::watch::{LiveQuery, QueryHub};

/// In-memory implementation of [`EmployeeStore`].
///
/// A `RwLock<BTreeMap>` keyed by id, so the roster shape comes out in id
/// order. Lock order is data before hub everywhere: subscription seeds and
/// mutation publishes can never observe the map mid-write.
pub struct MemoryStore {
    data: RwLock<BTreeMap<u32, Employee>>,
    queries: QueryHub,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            queries: QueryHub::new(),
        }
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Remove every record, notifying open live queries.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let removed: Vec<u32> = data.keys().copied().collect();
        data.clear();
        for id in removed {
            self.queries.publish_one(id, None);
        }
        if self.queries.wants_all() {
            self.queries.publish_all(Vec::new());
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn get(&self, id: u32) -> Result<Option<Employee>> {
        Ok(self.data.read().get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Employee>> {
        Ok(self.data.read().values().cloned().collect())
    }

    async fn upsert(&self, employee: Employee) -> Result<()> {
        let mut data = self.data.write();
        let id = employee.id;
        data.insert(id, employee.clone());

        self.queries.publish_one(id, Some(employee));
        if self.queries.wants_all() {
            self.queries.publish_all(data.values().cloned().collect());
        }
        Ok(())
    }

    async fn delete(&self, id: u32) -> Result<()> {
        let mut data = self.data.write();
        if data.remove(&id).is_some() {
            self.queries.publish_one(id, None);
            if self.queries.wants_all() {
                self.queries.publish_all(data.values().cloned().collect());
            }
        }
        Ok(())
    }

    async fn watch_all(&self) -> Result<LiveQuery<Vec<Employee>>> {
        let data = self.data.read();
        Ok(self.queries.subscribe_all(data.values().cloned().collect()))
    }

    async fn watch_by_id(&self, id: u32) -> Result<LiveQuery<Option<Employee>>> {
        let data = self.data.read();
        Ok(self.queries.subscribe_one(id, data.get(&id).cloned()))
    }
}
