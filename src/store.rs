//! EmployeeStore trait - the local-store abstraction all backends implement.
//!
//! Contract highlights:
//! - `upsert` inserts or replaces whole records by id: replace-on-conflict,
//!   never a merge, never an error on duplicates.
//! - `delete` of an absent id is a no-op, not an error.
//! - Every mutation notifies the affected live queries before the call
//!   returns: the all-employees shape on any mutation, an id shape only when
//!   that id changed.
//! - Reads may run concurrently with each other and with writes; each
//!   backend serializes its mutations so no two writers interleave on the
//!   same record.
//!
//! Code should depend on this trait, not on a specific backend.

use async_trait::async_trait;

use crate::employee::Employee;
use crate::error::Result;
use crate::watch::LiveQuery;

/// Keyed CRUD plus live queries over [`Employee`] records.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Fetch one employee by id.
    ///
    /// Returns `None` if no record with that id exists.
    async fn get(&self, id: u32) -> Result<Option<Employee>>;

    /// Fetch the full roster, ordered by id.
    async fn get_all(&self) -> Result<Vec<Employee>>;

    /// Insert a record, or replace the existing record with the same id.
    async fn upsert(&self, employee: Employee) -> Result<()>;

    /// Remove the record with this id, if present.
    async fn delete(&self, id: u32) -> Result<()>;

    /// Open a live view over the full roster.
    ///
    /// The handle's current value is seeded synchronously from the store and
    /// re-emitted after every mutation.
    async fn watch_all(&self) -> Result<LiveQuery<Vec<Employee>>>;

    /// Open a live view over zero-or-one record.
    ///
    /// The handle emits `None` while no record with this id exists.
    async fn watch_by_id(&self, id: u32) -> Result<LiveQuery<Option<Employee>>>;

    /// Check whether a record with this id exists.
    async fn exists(&self, id: u32) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}
