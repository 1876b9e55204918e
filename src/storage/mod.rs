// storage/mod.rs — SQLite-backed task store.
//
// The store exclusively owns persistence: handlers call these methods and
// never run SQL themselves. Absence is expressed as `Option`/`bool`; a
// database failure surfaces as `Err` and maps to a 500 at the REST layer.

use anyhow::{Context as _, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

/// Default timeout for individual SQLite queries.
/// Prevents a hung query from blocking the server indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// Maximum accepted `title` length, matching the column definition.
pub const MAX_TITLE_LEN: usize = 300;

// ─── Row types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub is_completed: bool,
}

/// A validated task payload ready to insert.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub is_completed: bool,
}

/// Partial update: `None` means "field omitted, leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

// ─── TaskStore ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    /// Open (or create) the database at `database_url` and bootstrap the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::bootstrap(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool. The caller is responsible for `bootstrap`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Idempotent schema creation, run once at startup.
    pub async fn bootstrap(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                 id           INTEGER PRIMARY KEY AUTOINCREMENT,
                 title        TEXT NOT NULL,
                 is_completed BOOLEAN NOT NULL DEFAULT 0
             )",
        )
        .execute(pool)
        .await
        .context("Failed to create tasks table")?;
        Ok(())
    }

    /// Insert a single task and return the stored row with its assigned id.
    pub async fn create(&self, title: &str, is_completed: bool) -> Result<TaskRow> {
        let result = sqlx::query("INSERT INTO tasks (title, is_completed) VALUES (?, ?)")
            .bind(title)
            .bind(is_completed)
            .execute(&self.pool)
            .await?;
        let id = result.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("task not found after insert"))
    }

    /// Insert a batch of tasks inside one transaction, in submission order.
    ///
    /// All-or-nothing: any failed insert rolls the whole batch back.
    /// Returns the assigned ids, in submission order.
    pub async fn create_bulk(&self, items: &[NewTask]) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let result = sqlx::query("INSERT INTO tasks (title, is_completed) VALUES (?, ?)")
                .bind(&item.title)
                .bind(item.is_completed)
                .execute(&mut *tx)
                .await?;
            ids.push(result.last_insert_rowid());
        }
        tx.commit().await?;
        Ok(ids)
    }

    pub async fn get(&self, id: i64) -> Result<Option<TaskRow>> {
        Ok(
            sqlx::query_as("SELECT id, title, is_completed FROM tasks WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// All rows, order unspecified.
    pub async fn list(&self) -> Result<Vec<TaskRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT id, title, is_completed FROM tasks")
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    /// Apply a partial update; only fields present in the patch change.
    /// Returns the updated row, or `None` when the id does not exist.
    pub async fn update(&self, id: i64, patch: &TaskPatch) -> Result<Option<TaskRow>> {
        let result = sqlx::query(
            "UPDATE tasks
             SET title = COALESCE(?, title),
                 is_completed = COALESCE(?, is_completed)
             WHERE id = ?",
        )
        .bind(patch.title.as_deref())
        .bind(patch.is_completed)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    /// Returns false when the id does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> TaskStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        TaskStore::bootstrap(&pool).await.unwrap();
        TaskStore::new(pool)
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let s = test_store().await;
        let created = s.create("Buy milk", false).await.unwrap();
        assert!(created.id > 0);

        let fetched = s.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Buy milk");
        assert!(!fetched.is_completed);
    }

    #[tokio::test]
    async fn get_missing_id_is_none() {
        let s = test_store().await;
        assert!(s.get(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_all_rows() {
        let s = test_store().await;
        s.create("a", false).await.unwrap();
        s.create("b", true).await.unwrap();
        s.create("c", false).await.unwrap();

        let rows = s.list().await.unwrap();
        assert_eq!(rows.len(), 3);
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        for t in ["a", "b", "c"] {
            assert!(titles.contains(&t));
        }
    }

    #[tokio::test]
    async fn update_only_completed_leaves_title() {
        let s = test_store().await;
        let task = s.create("unchanged", false).await.unwrap();

        let patch = TaskPatch {
            title: None,
            is_completed: Some(true),
        };
        let updated = s.update(task.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "unchanged");
        assert!(updated.is_completed);
    }

    #[tokio::test]
    async fn update_title_leaves_completed() {
        let s = test_store().await;
        let task = s.create("old", true).await.unwrap();

        let patch = TaskPatch {
            title: Some("new".to_string()),
            is_completed: None,
        };
        let updated = s.update(task.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "new");
        assert!(updated.is_completed);
    }

    #[tokio::test]
    async fn update_missing_id_is_none() {
        let s = test_store().await;
        let patch = TaskPatch {
            title: Some("x".to_string()),
            is_completed: None,
        };
        assert!(s.update(7, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_then_get_is_none() {
        let s = test_store().await;
        let task = s.create("doomed", false).await.unwrap();
        assert!(s.delete(task.id).await.unwrap());
        assert!(s.get(task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_id_is_false() {
        let s = test_store().await;
        assert!(!s.delete(99).await.unwrap());
    }

    #[tokio::test]
    async fn bulk_create_assigns_ids_in_submission_order() {
        let s = test_store().await;
        let items = vec![
            NewTask {
                title: "a".to_string(),
                is_completed: false,
            },
            NewTask {
                title: "b".to_string(),
                is_completed: true,
            },
        ];
        let ids = s.create_bulk(&items).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);

        let second = s.get(ids[1]).await.unwrap().unwrap();
        assert_eq!(second.title, "b");
        assert!(second.is_completed);
    }

    #[tokio::test]
    async fn bulk_create_permits_empty_titles() {
        // Bulk items default to an empty title; single create rejects them.
        let s = test_store().await;
        let items = vec![NewTask {
            title: String::new(),
            is_completed: false,
        }];
        let ids = s.create_bulk(&items).await.unwrap();
        let row = s.get(ids[0]).await.unwrap().unwrap();
        assert_eq!(row.title, "");
    }
}
