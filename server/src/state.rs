// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::auth::{AuthProvider, SqliteAuthProvider};
use crate::calendar::CalendarSettings;
use crate::database::SqliteTaskStore;
use crate::store::TaskStore;

use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared, read-only handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<dyn TaskStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub calendar: Arc<CalendarSettings>,
    /// Report other users' tasks as missing instead of forbidden.
    pub conceal_foreign_tasks: bool,
}

impl AppState {
    /// Wires the SQLite-backed task store and auth provider onto one pool.
    pub fn sqlite(pool: SqlitePool, calendar: CalendarSettings, conceal_foreign_tasks: bool) -> Self {
        Self {
            tasks: Arc::new(SqliteTaskStore::new(pool.clone())),
            auth: Arc::new(SqliteAuthProvider::new(pool)),
            calendar: Arc::new(calendar),
            conceal_foreign_tasks,
        }
    }
}
