//! # roster-sync
//!
//! Cache-aside synchronization for an employee roster.
//!
//! An [`EmployeeRepository`] answers every read from a local
//! [`EmployeeStore`] and refreshes that store from a remote
//! [`RemoteDirectory`] in the background:
//!
//! - **Live queries**: [`LiveQuery`] handles re-emit whenever rows change
//! - **Cache-aside reads**: local answer first, remote refresh after
//! - **Absorbed failures**: refresh errors go to an [`ErrorSink`], never to callers
//! - **Shared instances**: one repository per backing store, process-wide
//!
//! ## Backends
//!
//! - [`SqliteStore`]: durable SQLite database (production)
//! - [`MemoryStore`]: in-memory store (testing and development)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roster_sync::{EmployeeRepository, RosterConfig};
//!
//! #[tokio::main]
//! async fn main() -> roster_sync::Result<()> {
//!     let config = RosterConfig::sqlite("roster.db");
//!     let repository = EmployeeRepository::shared(&config).await?;
//!
//!     // Local rows now, refreshed rows when the directory answers.
//!     let mut roster = repository.all_employees().await?;
//!     println!("cached: {} employees", roster.current().len());
//!
//!     if let Some(refreshed) = roster.next().await {
//!         println!("refreshed: {} employees", refreshed.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Direct wiring
//!
//! Any [`EmployeeStore`] and [`RemoteDirectory`] implementation can be
//! wired by hand, which is how tests substitute fakes:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use roster_sync::{EmployeeRepository, HttpDirectory, MemoryStore, RemoteConfig};
//!
//! #[tokio::main]
//! async fn main() -> roster_sync::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let remote = Arc::new(HttpDirectory::new(&RemoteConfig::default())?);
//!     let repository = EmployeeRepository::new(store, remote);
//!
//!     let mut tracked = repository.employee_by_id(1).await?;
//!     if let Some(employee) = tracked.next().await.flatten() {
//!         println!("{} earns {}", employee.name, employee.salary);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod employee;
pub mod error;
pub mod memory;
pub mod remote;
pub mod report;
pub mod repository;
pub mod sqlite;
pub mod store;
pub mod watch;

// Re-export main types
pub use config::{RemoteConfig, RosterConfig, StoreLocation, DEFAULT_BASE_URL};
pub use employee::Employee;
pub use error::{Result, SyncError};
pub use memory::MemoryStore;
pub use remote::{HttpDirectory, RemoteDirectory};
pub use report::{CapturingSink, ErrorSink, TracingSink};
pub use repository::EmployeeRepository;
pub use sqlite::SqliteStore;
pub use store::EmployeeStore;
pub use watch::LiveQuery;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{RemoteConfig, RosterConfig, StoreLocation};
    pub use crate::employee::Employee;
    pub use crate::error::{Result, SyncError};
    pub use crate::memory::MemoryStore;
    pub use crate::remote::{HttpDirectory, RemoteDirectory};
    pub use crate::report::{CapturingSink, ErrorSink, TracingSink};
    pub use crate::repository::EmployeeRepository;
    pub use crate::sqlite::SqliteStore;
    pub use crate::store::EmployeeStore;
    pub use crate::watch::LiveQuery;
}
