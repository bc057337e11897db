// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::Result;
use async_trait::async_trait;
use calendar_common::{NewTask, Task};
use chrono::NaiveDateTime;

/// Durable task records keyed by integer id.
///
/// Writes must be visible to the very next read; nothing above this trait
/// caches results.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Task>>;

    /// Stores a new task and returns it with its generated id.
    async fn insert(&self, task: NewTask) -> Result<Task>;

    /// Replaces the mutable fields of an existing task. Owner is left as is.
    /// Returns false if no task has this id.
    async fn update(&self, task: &Task) -> Result<bool>;

    /// Returns false if no task has this id.
    async fn delete_by_id(&self, id: i64) -> Result<bool>;

    /// Tasks scheduled within `[start, end]`, both ends inclusive.
    async fn find_by_date_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Task>>;

    async fn find_by_date_range_and_owner(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        owner: &str,
    ) -> Result<Vec<Task>>;
}
