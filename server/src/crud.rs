// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::calendar::{parse_wire_date, start_of_day};
use crate::error::AppError;
use crate::store::TaskStore;

use calendar_common::{NewTask, Task, TaskForm, Viewer};
use chrono::NaiveDateTime;
use tracing::{debug, error, info};

/// Validated task fields as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    /// Midnight of the submitted day.
    pub date: NaiveDateTime,
    pub text: String,
    pub done: bool,
}

impl TaskInput {
    /// Checks the form before anything reaches the store. Title and date are
    /// required; a missing text is stored empty and a missing `done` is false.
    pub fn from_form(form: TaskForm) -> Result<Self, AppError> {
        let title = form.title.map(|t| t.trim().to_string()).unwrap_or_default();
        if title.is_empty() {
            error!("Validation failed: title is empty.");
            return Err(AppError::validation("Title cannot be empty."));
        }

        let raw_date = form
            .date
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| AppError::validation("Date is required."))?;
        let date = parse_wire_date(&raw_date).map_err(AppError::Validation)?;

        Ok(Self {
            title,
            date: start_of_day(date),
            text: form.text.unwrap_or_default(),
            done: form.done.unwrap_or(false),
        })
    }
}

/// Passes when the viewer owns the task or is an administrator.
pub fn authorize(task: &Task, viewer: &Viewer) -> Result<(), AppError> {
    if viewer.can_manage(task) {
        Ok(())
    } else {
        error!(
            "User {} is not allowed to act on task {} owned by {}.",
            viewer.username, task.id, task.owner
        );
        Err(AppError::Forbidden(task.id))
    }
}

/// Loads a task and runs the ownership guard on it.
async fn load_authorized(store: &dyn TaskStore, id: i64, viewer: &Viewer) -> Result<Task, AppError> {
    let task = store.get_by_id(id).await?.ok_or_else(|| {
        error!("Task with ID {} not found.", id);
        AppError::NotFound(id)
    })?;
    authorize(&task, viewer)?;
    Ok(task)
}

/// Creates a task owned by the viewer. New tasks are never done.
pub async fn create_task(
    store: &dyn TaskStore,
    input: TaskInput,
    viewer: &Viewer,
) -> Result<Task, AppError> {
    debug!("Creating task '{}' for {}", input.title, viewer.username);
    let task = store
        .insert(NewTask {
            title: input.title,
            date: input.date,
            text: input.text,
            done: false,
            owner: viewer.username.clone(),
        })
        .await?;
    info!("Task created successfully with ID: {}", task.id);
    Ok(task)
}

pub async fn task_for_edit(store: &dyn TaskStore, id: i64, viewer: &Viewer) -> Result<Task, AppError> {
    load_authorized(store, id, viewer).await
}

/// Replaces every mutable field of a task. Id and owner never change.
pub async fn update_task(
    store: &dyn TaskStore,
    id: i64,
    input: TaskInput,
    viewer: &Viewer,
) -> Result<Task, AppError> {
    let existing = load_authorized(store, id, viewer).await?;
    let updated = Task {
        title: input.title,
        date: input.date,
        text: input.text,
        done: input.done,
        ..existing
    };

    // The row may have been deleted since it was loaded.
    if !store.update(&updated).await? {
        return Err(AppError::NotFound(id));
    }
    info!("Task with ID {} updated by {}.", id, viewer.username);
    Ok(updated)
}

pub async fn delete_task(store: &dyn TaskStore, id: i64, viewer: &Viewer) -> Result<(), AppError> {
    load_authorized(store, id, viewer).await?;

    if !store.delete_by_id(id).await? {
        return Err(AppError::NotFound(id));
    }
    info!("Task with ID {} deleted by {}.", id, viewer.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{viewer, UnreachableStore};
    use crate::database::{memory_pool, upsert_user, SqliteTaskStore};
    use calendar_common::Role;
    use chrono::NaiveDate;

    async fn setup_store() -> SqliteTaskStore {
        let pool = memory_pool().await.unwrap();
        for name in ["alice", "bob", "root"] {
            upsert_user(&pool, name, "hash", Role::User, name).await.unwrap();
        }
        SqliteTaskStore::new(pool)
    }

    fn form(title: &str, date: &str, text: &str, done: Option<bool>) -> TaskForm {
        TaskForm {
            title: Some(title.to_string()),
            date: Some(date.to_string()),
            text: Some(text.to_string()),
            done,
        }
    }

    fn input(title: &str, date: &str, done: bool) -> TaskInput {
        TaskInput::from_form(form(title, date, "details", Some(done))).unwrap()
    }

    #[test]
    fn test_from_form_requires_title_and_date() {
        let missing_title = TaskForm {
            title: Some("   ".to_string()),
            ..form("x", "2024-02-01", "", None)
        };
        assert!(matches!(
            TaskInput::from_form(missing_title),
            Err(AppError::Validation(_))
        ));

        let missing_date = TaskForm {
            date: None,
            ..form("x", "2024-02-01", "", None)
        };
        assert!(matches!(
            TaskInput::from_form(missing_date),
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            TaskInput::from_form(form("x", "2024/02/01", "", None)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_from_form_uses_start_of_day() {
        let parsed = TaskInput::from_form(TaskForm {
            text: None,
            ..form("Dentist", "2024-02-14", "", None)
        })
        .unwrap();
        assert_eq!(
            parsed.date,
            NaiveDate::from_ymd_opt(2024, 2, 14)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(parsed.text, "");
        assert!(!parsed.done);
    }

    #[tokio::test]
    async fn test_create_then_read_round_trip() {
        let store = setup_store().await;
        let alice = viewer("alice", Role::User);

        let created = create_task(&store, input("Dentist", "2024-02-14", true), &alice)
            .await
            .unwrap();
        assert_eq!(created.owner, "alice");
        // `done` is ignored on creation.
        assert!(!created.done);

        let read = task_for_edit(&store, created.id, &alice).await.unwrap();
        assert_eq!(read, created);
        assert_eq!(read.title, "Dentist");
        assert_eq!(read.text, "details");
    }

    #[tokio::test]
    async fn test_update_is_idempotent_and_keeps_owner() {
        let store = setup_store().await;
        let alice = viewer("alice", Role::User);
        let created = create_task(&store, input("Draft", "2024-02-14", false), &alice)
            .await
            .unwrap();

        let change = input("Final", "2024-02-20", true);
        let once = update_task(&store, created.id, change.clone(), &alice).await.unwrap();
        let after_once = store.get_by_id(created.id).await.unwrap();
        let twice = update_task(&store, created.id, change, &alice).await.unwrap();
        let after_twice = store.get_by_id(created.id).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(after_once, after_twice);
        assert_eq!(twice.id, created.id);
        assert_eq!(twice.owner, "alice");
        assert!(twice.done);
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let store = setup_store().await;
        let result = update_task(
            &store,
            404,
            input("Ghost", "2024-02-14", false),
            &viewer("root", Role::Admin),
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(404))));
    }

    #[tokio::test]
    async fn test_delete_then_read_is_not_found() {
        let store = setup_store().await;
        let alice = viewer("alice", Role::User);
        let created = create_task(&store, input("Temp", "2024-02-14", false), &alice)
            .await
            .unwrap();

        delete_task(&store, created.id, &alice).await.unwrap();
        assert!(matches!(
            task_for_edit(&store, created.id, &alice).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_task(&store, created.id, &alice).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_touch_foreign_task() {
        let store = setup_store().await;
        let alice = viewer("alice", Role::User);
        let bob = viewer("bob", Role::User);
        let created = create_task(&store, input("Private", "2024-02-14", false), &alice)
            .await
            .unwrap();

        assert!(matches!(
            task_for_edit(&store, created.id, &bob).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            update_task(&store, created.id, input("Hacked", "2024-03-01", true), &bob).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            delete_task(&store, created.id, &bob).await,
            Err(AppError::Forbidden(_))
        ));

        let unchanged = store.get_by_id(created.id).await.unwrap();
        assert_eq!(unchanged, Some(created));
    }

    #[tokio::test]
    async fn test_admin_can_edit_and_delete_any_task() {
        let store = setup_store().await;
        let alice = viewer("alice", Role::User);
        let admin = viewer("root", Role::Admin);
        let created = create_task(&store, input("Shared", "2024-02-14", false), &alice)
            .await
            .unwrap();

        let updated = update_task(&store, created.id, input("Checked", "2024-02-14", true), &admin)
            .await
            .unwrap();
        assert_eq!(updated.owner, "alice");

        delete_task(&store, created.id, &admin).await.unwrap();
        assert_eq!(store.get_by_id(created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_store_unavailable() {
        let alice = viewer("alice", Role::User);
        assert!(matches!(
            task_for_edit(&UnreachableStore, 1, &alice).await,
            Err(AppError::StoreUnavailable(_))
        ));
        assert!(matches!(
            create_task(&UnreachableStore, input("x", "2024-02-14", false), &alice).await,
            Err(AppError::StoreUnavailable(_))
        ));
    }
}
