// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Wire format for every date exchanged with clients (`YYYY-MM-DD`).
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

/// One calendar row, Sunday through Saturday.
pub type Week = [NaiveDate; 7];

/// Tasks grouped by the date-only component of their scheduled instant.
/// Dates without tasks are absent rather than mapped to an empty list.
pub type TasksByDate = BTreeMap<NaiveDate, Vec<Task>>;

#[allow(clippy::doc_overindented_list_items)]
/// Represents a task within the system.
///
/// Derivation attributes (derive):
/// - `Serialize`, `Deserialize`: Allows conversion to/from JSON.
/// - `sqlx::FromRow`: Allows `sqlx` to create a `Task` instance directly
///    from a database result row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Task {
    #[sqlx(rename = "id")]
    pub id: i64,

    #[sqlx(rename = "title")]
    pub title: String,

    // Local wall-clock time, no timezone attached.
    #[sqlx(rename = "task_date")]
    pub date: NaiveDateTime,

    #[sqlx(rename = "description")]
    pub text: String,

    #[sqlx(rename = "done")]
    pub done: bool,

    #[sqlx(rename = "owner")]
    pub owner: String,
}

impl Task {
    /// The calendar day this task is displayed under.
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

/// A task that has not been stored yet and therefore has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub date: NaiveDateTime,
    pub text: String,
    pub done: bool,
    pub owner: String,
}

/// Structure used to receive task creation and edit data from the API.
///
/// Every field is optional here so that missing values are reported as
/// validation errors by the server instead of as body rejections.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct TaskForm {
    pub title: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub text: Option<String>,
    /// Ignored on creation, new tasks always start as not done.
    pub done: Option<bool>,
}

/// Blank task handed out by `GET /tasks/new`, pre-filled with a date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskTemplate {
    pub title: String,
    pub date: NaiveDate,
    pub text: String,
    pub done: bool,
}

impl TaskTemplate {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            title: String::new(),
            date,
            text: String::new(),
            done: false,
        }
    }
}

/// Everything a client needs to draw one month of the calendar.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MonthView {
    /// The date the view was requested for.
    pub current: NaiveDate,
    pub grid: Vec<Week>,
    pub tasks_by_date: TasksByDate,
    pub month_label: String,
    pub prev_month_link: String,
    pub next_month_link: String,
}

/// Role held by a user account.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}', expected USER or ADMIN", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// A provisioned account as stored in the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role_name: Role,
    pub display_name: String,
}

/// The authenticated identity making the current request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub username: String,
    pub display_name: String,
    pub roles: Vec<Role>,
}

impl Viewer {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Whether this viewer may read or modify `task`.
    pub fn can_manage(&self, task: &Task) -> bool {
        self.is_admin() || task.owner == self.username
    }
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            roles: vec![user.role_name],
        }
    }
}
