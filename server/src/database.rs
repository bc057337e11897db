// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::store::TaskStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use calendar_common::{NewTask, Role, Task, User};
use chrono::NaiveDateTime;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use tracing::{debug, info};

const TASK_COLUMNS: &str = "id, title, task_date, description, done, owner";

/// Establishes the database connection pool.
/// If the database does not exist, it creates it.
/// It also ensures the `users` and `tasks` tables have the correct schema.
pub async fn establish_connection_pool(database_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!("Creating database {}", database_url);
        ensure_parent_dir(database_url)?;
        Sqlite::create_database(database_url)
            .await
            .context("Failed to create database")?;
    } else {
        info!("Database already exists.");
    }

    let pool = SqlitePool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Opens a private in-memory database with the full schema.
///
/// The pool holds a single connection that never expires, otherwise every
/// new connection would see its own empty database.
pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .context("Failed to open in-memory database")?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Creates the `users` and `tasks` tables if they are missing.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            username TEXT PRIMARY KEY NOT NULL,
            password_hash TEXT NOT NULL,
            role_name TEXT NOT NULL,
            display_name TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'users' table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            task_date TIMESTAMP NOT NULL,
            description TEXT NOT NULL,
            done BOOLEAN NOT NULL DEFAULT 0,
            owner TEXT NOT NULL REFERENCES users(username)
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'tasks' table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_date_owner ON tasks (task_date, owner);")
        .execute(pool)
        .await
        .context("Failed to create 'tasks' index")?;

    info!("'users' and 'tasks' tables are ready.");

    Ok(())
}

fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Inserts a user, or replaces the credential, role and display name of an
/// existing one.
pub async fn upsert_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    role: Role,
    display_name: &str,
) -> Result<()> {
    debug!("Upserting user {} with role {}", username, role);
    sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, role_name, display_name)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(username) DO UPDATE SET
            password_hash = excluded.password_hash,
            role_name = excluded.role_name,
            display_name = excluded.display_name
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .bind(display_name)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to upsert user {}", username))?;

    Ok(())
}

pub async fn find_user(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(
        "SELECT username, password_hash, role_name, display_name FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Failed to look up user {}", username))
}

/// `TaskStore` backed by the SQLite `tasks` table.
#[derive(Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<Task>> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch task with ID: {}", id))
    }

    async fn insert(&self, task: NewTask) -> Result<Task> {
        debug!(
            "Insert values: title={}, date={}, done={}, owner={}",
            task.title, task.date, task.done, task.owner
        );

        let id = sqlx::query(
            "INSERT INTO tasks (title, task_date, description, done, owner) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&task.title)
        .bind(task.date)
        .bind(&task.text)
        .bind(task.done)
        .bind(&task.owner)
        .execute(&self.pool)
        .await
        .context("Failed to insert task into DB")?
        .last_insert_rowid();

        Ok(Task {
            id,
            title: task.title,
            date: task.date,
            text: task.text,
            done: task.done,
            owner: task.owner,
        })
    }

    async fn update(&self, task: &Task) -> Result<bool> {
        debug!("Updating task with ID: {}", task.id);
        let result = sqlx::query(
            "UPDATE tasks SET title = ?, task_date = ?, description = ?, done = ? WHERE id = ?",
        )
        .bind(&task.title)
        .bind(task.date)
        .bind(&task.text)
        .bind(task.done)
        .bind(task.id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update task with ID: {}", task.id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        debug!("Attempting to delete task with ID: {}", id);
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete task with ID: {}", id))?;

        let rows_affected = result.rows_affected();
        info!("Deleted {} rows for task ID: {}", rows_affected, id);

        Ok(rows_affected > 0)
    }

    async fn find_by_date_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Task>> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE task_date BETWEEN ? AND ? ORDER BY task_date ASC, id ASC",
            TASK_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("Failed to retrieve tasks in date range from DB")
    }

    async fn find_by_date_range_and_owner(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        owner: &str,
    ) -> Result<Vec<Task>> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE task_date BETWEEN ? AND ? AND owner = ? ORDER BY task_date ASC, id ASC",
            TASK_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to retrieve tasks in date range for {}", owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    /// Helper function to set up an in-memory SQLite database with two users.
    async fn setup_test_db() -> SqliteTaskStore {
        let pool = memory_pool().await.unwrap();
        upsert_user(&pool, "alice", "hash", Role::User, "Alice").await.unwrap();
        upsert_user(&pool, "bob", "hash", Role::User, "Bob").await.unwrap();
        SqliteTaskStore::new(pool)
    }

    fn new_task(title: &str, date: NaiveDateTime, owner: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            date,
            text: format!("{} notes", title),
            done: false,
            owner: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_task() {
        let store = setup_test_db().await;

        let created = store
            .insert(new_task("Groceries", at(2024, 2, 3, 10, 0), "alice"))
            .await
            .unwrap();
        assert!(created.id > 0);

        let fetched = store.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
        assert_eq!(store.get_by_id(9999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_owner() {
        let store = setup_test_db().await;
        let result = store
            .insert(new_task("Orphan", at(2024, 2, 3, 10, 0), "mallory"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_replaces_fields_but_keeps_owner() {
        let store = setup_test_db().await;
        let created = store
            .insert(new_task("Draft", at(2024, 2, 3, 10, 0), "alice"))
            .await
            .unwrap();

        let edited = Task {
            title: "Final".to_string(),
            date: at(2024, 2, 5, 0, 0),
            text: "Rewritten".to_string(),
            done: true,
            owner: "bob".to_string(),
            ..created.clone()
        };
        assert!(store.update(&edited).await.unwrap());

        let stored = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Final");
        assert_eq!(stored.date, at(2024, 2, 5, 0, 0));
        assert!(stored.done);
        assert_eq!(stored.owner, "alice");

        let missing = Task { id: 4242, ..edited };
        assert!(!store.update(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_task() {
        let store = setup_test_db().await;
        let created = store
            .insert(new_task("Temp", at(2024, 2, 3, 10, 0), "alice"))
            .await
            .unwrap();

        assert!(store.delete_by_id(created.id).await.unwrap());
        assert_eq!(store.get_by_id(created.id).await.unwrap(), None);
        // A second delete finds nothing.
        assert!(!store.delete_by_id(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_range_queries_are_inclusive_and_ordered() {
        let store = setup_test_db().await;
        let late = store
            .insert(new_task("Late", at(2024, 2, 29, 23, 59), "alice"))
            .await
            .unwrap();
        let early = store
            .insert(new_task("Early", at(2024, 2, 1, 0, 0), "bob"))
            .await
            .unwrap();
        store
            .insert(new_task("Outside", at(2024, 3, 1, 0, 0), "alice"))
            .await
            .unwrap();

        let start = at(2024, 2, 1, 0, 0);
        let end = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap();

        let all = store.find_by_date_range(start, end).await.unwrap();
        assert_eq!(all, vec![early.clone(), late.clone()]);

        let alice_only = store
            .find_by_date_range_and_owner(start, end, "alice")
            .await
            .unwrap();
        assert_eq!(alice_only, vec![late]);
    }

    #[tokio::test]
    async fn test_same_instant_keeps_insertion_order() {
        let store = setup_test_db().await;
        let first = store
            .insert(new_task("First", at(2024, 2, 3, 0, 0), "alice"))
            .await
            .unwrap();
        let second = store
            .insert(new_task("Second", at(2024, 2, 3, 0, 0), "alice"))
            .await
            .unwrap();

        let tasks = store
            .find_by_date_range(at(2024, 2, 3, 0, 0), at(2024, 2, 3, 23, 0))
            .await
            .unwrap();
        assert_eq!(tasks, vec![first, second]);
    }

    #[tokio::test]
    async fn test_upsert_user_replaces_role() {
        let store = setup_test_db().await;
        upsert_user(&store.pool, "alice", "new-hash", Role::Admin, "Alice A.")
            .await
            .unwrap();

        let user = find_user(&store.pool, "alice").await.unwrap().unwrap();
        assert_eq!(user.role_name, Role::Admin);
        assert_eq!(user.password_hash, "new-hash");
        assert_eq!(user.display_name, "Alice A.");
        assert!(find_user(&store.pool, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_establish_connection_pool_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("calendar.db");
        let url = format!("sqlite://{}", db_path.display());

        let pool = establish_connection_pool(&url).await.unwrap();
        assert!(db_path.exists());

        // Running the bootstrap twice is harmless.
        init_schema(&pool).await.unwrap();
        pool.close().await;
    }
}
