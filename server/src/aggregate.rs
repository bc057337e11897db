// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::store::TaskStore;

use anyhow::Result;
use calendar_common::{Task, TasksByDate, Viewer};
use chrono::NaiveDateTime;
use tracing::debug;

/// Which tasks a viewer is allowed to see, decided once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScope {
    /// Administrators see every user's tasks.
    Everyone,
    OwnedBy(String),
}

impl TaskScope {
    pub fn for_viewer(viewer: &Viewer) -> Self {
        if viewer.is_admin() {
            TaskScope::Everyone
        } else {
            TaskScope::OwnedBy(viewer.username.clone())
        }
    }

    /// Runs the range query matching this scope.
    pub async fn fetch(
        &self,
        store: &dyn TaskStore,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Task>> {
        match self {
            TaskScope::Everyone => store.find_by_date_range(start, end).await,
            TaskScope::OwnedBy(owner) => store.find_by_date_range_and_owner(start, end, owner).await,
        }
    }
}

/// Fetches the tasks `viewer` may see in `[start, end]` and groups them by day.
///
/// Store errors are returned untouched.
pub async fn aggregate(
    store: &dyn TaskStore,
    start: NaiveDateTime,
    end: NaiveDateTime,
    viewer: &Viewer,
) -> Result<TasksByDate> {
    let scope = TaskScope::for_viewer(viewer);
    let tasks = scope.fetch(store, start, end).await?;
    debug!(
        "Aggregating {} tasks between {} and {} for {} ({:?})",
        tasks.len(),
        start,
        end,
        viewer.username,
        scope
    );
    Ok(group_by_day(tasks))
}

/// Groups tasks under the date part of their instant, keeping their order.
pub fn group_by_day(tasks: impl IntoIterator<Item = Task>) -> TasksByDate {
    let mut grouped = TasksByDate::new();
    for task in tasks {
        grouped.entry(task.day()).or_default().push(task);
    }
    grouped
}
