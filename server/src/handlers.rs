// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::auth::Authenticated;
use crate::calendar::{calendar_link, format_wire_date, parse_wire_date};
use crate::crud::{self, TaskInput};
use crate::error::AppError;
use crate::state::AppState;
use crate::view::{self, resolve_requested_date};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::Redirect,
};
use calendar_common::{MonthView, Task, TaskForm, TaskTemplate};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

/// Optional `?date=YYYY-MM-DD` query parameter.
#[derive(Deserialize, Debug, Default)]
pub struct DateQuery {
    pub date: Option<String>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Handler for `GET /calendar`: one month of the calendar for the viewer.
pub async fn show_calendar(
    State(state): State<AppState>,
    Authenticated(viewer): Authenticated,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<MonthView>, AppError> {
    let Query(query) = query?;
    debug!(
        "Calendar requested by {} for {:?}",
        viewer.username, query.date
    );
    let month = view::render_month(
        state.tasks.as_ref(),
        &state.calendar,
        query.date.as_deref(),
        today(),
        &viewer,
    )
    .await?;
    info!(
        "Rendered {} for {} with {} days holding tasks.",
        month.month_label,
        viewer.username,
        month.tasks_by_date.len()
    );
    Ok(Json(month))
}

/// Handler for `GET /`, sends the browser to the calendar. A valid `date`
/// is carried over, anything else is dropped.
pub async fn redirect_to_calendar(query: Result<Query<DateQuery>, QueryRejection>) -> Redirect {
    let date = query.ok().and_then(|Query(query)| query.date);
    match date.as_deref().map(parse_wire_date) {
        Some(Ok(date)) => Redirect::to(&calendar_link(date)),
        _ => Redirect::to("/calendar"),
    }
}

/// Handler for `GET /tasks/new`: a blank task for the requested day (or today).
pub async fn new_task_form(
    Authenticated(viewer): Authenticated,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<TaskTemplate>, AppError> {
    let Query(query) = query?;
    let date = resolve_requested_date(query.date.as_deref(), today())?;
    debug!(
        "New task form for {} on {}",
        viewer.username,
        format_wire_date(date)
    );
    Ok(Json(TaskTemplate::for_date(date)))
}

/// Handler for creating a new task.
pub async fn create_task(
    State(state): State<AppState>,
    Authenticated(viewer): Authenticated,
    form: Result<Json<TaskForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let Json(form) = form?;
    debug!("Received request to create task for user: {}", viewer.username);
    let input = TaskInput::from_form(form)?;
    let task = crud::create_task(state.tasks.as_ref(), input, &viewer).await?;

    // Return a 201 Created status with the new task as JSON.
    Ok((StatusCode::CREATED, Json(task)))
}

/// Handler for `GET /tasks/{id}/edit`.
pub async fn edit_task_form(
    State(state): State<AppState>,
    Authenticated(viewer): Authenticated,
    task_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Task>, AppError> {
    let Path(task_id) = task_id?;
    let task = crud::task_for_edit(state.tasks.as_ref(), task_id, &viewer)
        .await
        .map_err(|e| e.conceal_foreign(state.conceal_foreign_tasks))?;
    Ok(Json(task))
}

/// Handler for `POST /tasks/{id}`: replaces the task's title, date, text and done flag.
pub async fn update_task(
    State(state): State<AppState>,
    Authenticated(viewer): Authenticated,
    task_id: Result<Path<i64>, PathRejection>,
    form: Result<Json<TaskForm>, JsonRejection>,
) -> Result<Json<Task>, AppError> {
    let Path(task_id) = task_id?;
    let Json(form) = form?;
    debug!("Attempting to update task with ID: {}", task_id);
    let input = TaskInput::from_form(form)?;
    let task = crud::update_task(state.tasks.as_ref(), task_id, input, &viewer)
        .await
        .map_err(|e| e.conceal_foreign(state.conceal_foreign_tasks))?;
    Ok(Json(task))
}

/// Handler for deleting a task by ID.
pub async fn delete_task(
    State(state): State<AppState>,
    Authenticated(viewer): Authenticated,
    task_id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(task_id) = task_id?;
    debug!("Attempting to delete task with ID: {}", task_id);
    crud::delete_task(state.tasks.as_ref(), task_id, &viewer)
        .await
        .map_err(|e| e.conceal_foreign(state.conceal_foreign_tasks))?;

    Ok(StatusCode::NO_CONTENT) // 204 No Content for successful deletion
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendar_common::{Role, Viewer};
    use sqlx::SqlitePool;
    use crate::calendar::CalendarSettings;

    fn alice() -> Authenticated {
        Authenticated(Viewer {
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            roles: vec![Role::User],
        })
    }

    async fn state() -> AppState {
        // Validation fails before any DB access, so an empty database is enough.
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        AppState::sqlite(pool, CalendarSettings::default(), true)
    }

    #[tokio::test]
    async fn test_create_task_validation_empty_title() {
        let form = TaskForm {
            title: Some(String::new()),
            date: Some("2024-02-01".to_string()),
            ..TaskForm::default()
        };

        let result = create_task(State(state().await), alice(), Ok(Json(form))).await;

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Title cannot be empty.");
    }

    #[tokio::test]
    async fn test_calendar_rejects_malformed_date() {
        let query = DateQuery {
            date: Some("2024-02-31".to_string()),
        };

        let result = show_calendar(State(state().await), alice(), Ok(Query(query))).await;

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Invalid date"));
    }

    #[tokio::test]
    async fn test_new_task_form_uses_requested_day() {
        let query = DateQuery {
            date: Some("2024-02-14".to_string()),
        };
        let Json(template) = new_task_form(alice(), Ok(Query(query))).await.unwrap();
        assert_eq!(template.date, NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
        assert!(template.title.is_empty());
        assert!(!template.done);
    }
}
