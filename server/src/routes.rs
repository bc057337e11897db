// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Creates and configures the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // `GET /` redirects to the month view
        .route("/", get(handlers::redirect_to_calendar))
        // `GET /calendar?date=YYYY-MM-DD` renders one month
        .route("/calendar", get(handlers::show_calendar))
        // `GET /tasks/new` hands out a blank task
        .route("/tasks/new", get(handlers::new_task_form))
        .route("/tasks", post(handlers::create_task))
        .route("/tasks/{id}/edit", get(handlers::edit_task_form))
        .route("/tasks/{id}", post(handlers::update_task))
        .route("/tasks/{id}/delete", post(handlers::delete_task))
        // Adds the stores and settings to the application state
        .with_state(state)
}
