//! SQLite-backed employee store.
//!
//! The durable backend. WAL mode keeps readers concurrent with the single
//! writer. Live queries are fed in-process and do not cross processes, so a
//! second process opening the same file sees writes but no notifications.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::employee::Employee;
use crate::error::Result;
use crate::store::EmployeeStore;
use crate::watch::{LiveQuery, QueryHub};

type EmployeeRow = (i64, String, i64, i64, String);

fn row_to_employee((id, name, salary, age, image_url): EmployeeRow) -> Employee {
    Employee {
        id: id as u32,
        name,
        salary: salary as u32,
        age: age as u32,
        image_url,
    }
}

/// SQLite implementation of [`EmployeeStore`].
///
/// Mutations and subscription seeding share one async lock, so a new live
/// query can never seed from a half-applied write. Reads go straight to the
/// pool and run concurrently.
pub struct SqliteStore {
    pool: SqlitePool,
    queries: QueryHub,
    write_lock: Mutex<()>,
}

impl SqliteStore {
    /// Open or create a SQLite store at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening SQLite employee store at {:?}", path);

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            queries: QueryHub::new(),
            write_lock: Mutex::new(()),
        };

        store.init_schema().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Capped at one connection: every pooled connection of an in-memory
    /// SQLite database is its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            queries: QueryHub::new(),
            write_lock: Mutex::new(()),
        };

        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                salary INTEGER NOT NULL,
                age INTEGER NOT NULL,
                image_url TEXT NOT NULL DEFAULT ''
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("SQLite employees schema ready");
        Ok(())
    }

    async fn roster(&self) -> Result<Vec<Employee>> {
        let rows: Vec<EmployeeRow> = sqlx::query_as(
            "SELECT id, name, salary, age, image_url FROM employees ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_employee).collect())
    }

    async fn fetch_one(&self, id: u32) -> Result<Option<Employee>> {
        let row: Option<EmployeeRow> = sqlx::query_as(
            "SELECT id, name, salary, age, image_url FROM employees WHERE id = ?",
        )
        .bind(id as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_employee))
    }

    async fn publish_roster(&self) -> Result<()> {
        if self.queries.wants_all() {
            let roster = self.roster().await?;
            self.queries.publish_all(roster);
        }
        Ok(())
    }
}

#[async_trait]
impl EmployeeStore for SqliteStore {
    async fn get(&self, id: u32) -> Result<Option<Employee>> {
        self.fetch_one(id).await
    }

    async fn get_all(&self) -> Result<Vec<Employee>> {
        self.roster().await
    }

    async fn upsert(&self, employee: Employee) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        sqlx::query(
            r#"
            INSERT INTO employees (id, name, salary, age, image_url)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                salary = excluded.salary,
                age = excluded.age,
                image_url = excluded.image_url
            "#,
        )
        .bind(employee.id as i64)
        .bind(&employee.name)
        .bind(employee.salary as i64)
        .bind(employee.age as i64)
        .bind(&employee.image_url)
        .execute(&self.pool)
        .await?;

        let id = employee.id;
        self.queries.publish_one(id, Some(employee));
        self.publish_roster().await
    }

    async fn delete(&self, id: u32) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id as i64)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            self.queries.publish_one(id, None);
            self.publish_roster().await?;
        }
        Ok(())
    }

    async fn watch_all(&self) -> Result<LiveQuery<Vec<Employee>>> {
        let _guard = self.write_lock.lock().await;
        let seed = self.roster().await?;
        Ok(self.queries.subscribe_all(seed))
    }

    async fn watch_by_id(&self, id: u32) -> Result<LiveQuery<Option<Employee>>> {
        let _guard = self.write_lock.lock().await;
        let seed = self.fetch_one(id).await?;
        Ok(self.queries.subscribe_one(id, seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(n: u32) -> Employee {
        Employee::new(n, format!("employee-{n}"), 1_000 * n, 20 + n)
    }

    #[tokio::test]
    async fn test_sqlite_upsert_and_get() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.upsert(staff(1)).await.unwrap();

        let found = store.get(1).await.unwrap().unwrap();
        assert_eq!(found, staff(1));
    }

    #[tokio::test]
    async fn test_sqlite_get_nonexistent() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.get(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_upsert_replaces_whole_record() {
        let store = SqliteStore::in_memory().await.unwrap();

        store
            .upsert(staff(1).with_image_url("https://img/old.png"))
            .await
            .unwrap();
        let replacement = Employee::new(1, "renamed", 9_999, 61);
        store.upsert(replacement.clone()).await.unwrap();

        let found = store.get(1).await.unwrap().unwrap();
        assert_eq!(found, replacement);
        assert!(found.image_url.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_delete() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.upsert(staff(1)).await.unwrap();
        assert!(store.exists(1).await.unwrap());

        store.delete(1).await.unwrap();
        assert!(!store.exists(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_delete_nonexistent_is_noop() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.delete(7).await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_get_all_ordered_by_id() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.upsert(staff(30)).await.unwrap();
        store.upsert(staff(10)).await.unwrap();
        store.upsert(staff(20)).await.unwrap();

        let ids: Vec<u32> = store.get_all().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_sqlite_watch_all_seeded_and_updated() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert(staff(1)).await.unwrap();

        let mut roster = store.watch_all().await.unwrap();
        assert_eq!(roster.current(), vec![staff(1)]);

        store.upsert(staff(2)).await.unwrap();
        assert_eq!(roster.next().await.unwrap(), vec![staff(1), staff(2)]);
    }

    #[tokio::test]
    async fn test_sqlite_watch_by_id_sees_delete() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert(staff(5)).await.unwrap();

        let mut watching = store.watch_by_id(5).await.unwrap();
        assert_eq!(watching.current(), Some(staff(5)));

        store.delete(5).await.unwrap();
        assert_eq!(watching.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_watch_by_id_ignores_other_ids() {
        let store = SqliteStore::in_memory().await.unwrap();
        let watching = store.watch_by_id(1).await.unwrap();

        store.upsert(staff(2)).await.unwrap();
        assert!(!watching.has_update());
    }

    #[tokio::test]
    async fn test_sqlite_writes_without_watchers() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.upsert(staff(1)).await.unwrap();
        store.delete(1).await.unwrap();

        assert!(store.get_all().await.unwrap().is_empty());
    }
}
