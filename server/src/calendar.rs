// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use calendar_common::{Week, WIRE_DATE_FORMAT};
use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use tracing::warn;

/// Years a `YYYY-MM-DD` date can carry. Tasks never fall outside them.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1..=9999;

const FALLBACK_LABEL_FORMAT: &str = "%Y-%m";

/// How many weeks a month grid spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridPolicy {
    /// Just enough weeks to cover the month (4 to 6).
    #[default]
    Variable,
    /// Always 6 weeks, 42 cells.
    Fixed,
}

impl FromStr for GridPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "variable" => Ok(GridPolicy::Variable),
            "fixed" => Ok(GridPolicy::Fixed),
            other => Err(format!("expected 'variable' or 'fixed', got '{}'", other)),
        }
    }
}

impl fmt::Display for GridPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridPolicy::Variable => f.write_str("variable"),
            GridPolicy::Fixed => f.write_str("fixed"),
        }
    }
}

/// Per-deployment settings for the month view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSettings {
    pub grid_policy: GridPolicy,
    /// chrono format string used for the month label.
    pub month_label_format: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            grid_policy: GridPolicy::Variable,
            month_label_format: "%B %Y".to_string(),
        }
    }
}

/// Builds the week rows displayed for the month containing `target`.
///
/// The first cell is the Sunday on or before the 1st of the month and rows run
/// Sunday to Saturday, oldest first.
pub fn build_month_grid(target: NaiveDate, policy: GridPolicy) -> Vec<Week> {
    let first_of_month = first_of_month(target);
    let offset = first_of_month.weekday().num_days_from_sunday();
    let grid_start = first_of_month - Days::new(u64::from(offset));

    let num_weeks = match policy {
        GridPolicy::Variable => (offset + days_in_month(first_of_month)).div_ceil(7),
        GridPolicy::Fixed => 6,
    };

    (0..u64::from(num_weeks))
        .map(|week| std::array::from_fn(|day| grid_start + Days::new(week * 7 + day as u64)))
        .collect()
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    match date.month() {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(date.year()) => 29,
        2 => 28,
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Inclusive instant range covered by a grid: from midnight of the first cell
/// to 23:59:59.999 of the last one. Cells outside [`SUPPORTED_YEARS`] are left
/// out. `None` for an empty grid.
pub fn grid_range(grid: &[Week]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut days = grid
        .iter()
        .flatten()
        .copied()
        .filter(|day| SUPPORTED_YEARS.contains(&day.year()));
    let first = days.next()?;
    let last = days.last().unwrap_or(first);
    Some((start_of_day(first), end_of_day(last)))
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    (date + Days::new(1)).and_time(NaiveTime::MIN) - TimeDelta::milliseconds(1)
}

/// Shifts `date` by whole calendar months.
///
/// When the day-of-month does not exist in the target month it is clamped to
/// that month's last day (2024-03-31 minus one month is 2024-02-29).
pub fn shift_month(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let delta = Months::new(months.unsigned_abs());
    if months >= 0 {
        date.checked_add_months(delta)
    } else {
        date.checked_sub_months(delta)
    }
}

/// Month to link to from `date` when moving by `months`. At the edges of
/// [`SUPPORTED_YEARS`] the link stays on `date` itself.
pub fn navigable_month(date: NaiveDate, months: i32) -> NaiveDate {
    shift_month(date, months)
        .filter(|shifted| SUPPORTED_YEARS.contains(&shifted.year()))
        .unwrap_or(date)
}

/// Parses a `YYYY-MM-DD` date as sent on the wire.
///
/// The shape is strict (zero-padded, ten characters) and only
/// [`SUPPORTED_YEARS`] are accepted so that grid and month arithmetic always
/// stays inside chrono's range.
pub fn parse_wire_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    if !has_wire_shape(trimmed) {
        return Err(format!("Invalid date '{}', expected YYYY-MM-DD.", trimmed));
    }
    let date = NaiveDate::parse_from_str(trimmed, WIRE_DATE_FORMAT)
        .map_err(|e| format!("Invalid date '{}', expected YYYY-MM-DD: {}", trimmed, e))?;
    if !SUPPORTED_YEARS.contains(&date.year()) {
        return Err(format!("Date '{}' is out of the supported range.", trimmed));
    }
    Ok(date)
}

fn has_wire_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

pub fn format_wire_date(date: NaiveDate) -> String {
    date.format(WIRE_DATE_FORMAT).to_string()
}

/// Link to the month view for `date`.
pub fn calendar_link(date: NaiveDate) -> String {
    format!("/calendar?date={}", format_wire_date(date))
}

/// Checks that `format` can label a date: every specifier must be known to
/// chrono and must only need date fields (`%H` or `%Z` cannot render a
/// `NaiveDate`).
pub fn check_label_format(format: &str) -> Result<(), String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("'{}' is not a valid chrono format string", format));
    }
    render_label(NaiveDate::default(), format)
        .map(|_| ())
        .map_err(|_| format!("'{}' needs more than a date to render", format))
}

fn render_label(date: NaiveDate, format: &str) -> Result<String, fmt::Error> {
    use std::fmt::Write;

    let mut label = String::new();
    write!(label, "{}", date.format(format))?;
    Ok(label)
}

/// Renders the "Year Month" label using a chrono format string.
///
/// The configured format is checked at startup. A format that still fails here
/// is logged and replaced by `%Y-%m`.
pub fn month_label(date: NaiveDate, format: &str) -> String {
    match render_label(date, format) {
        Ok(label) => label,
        Err(_) => {
            warn!(
                "Month label format '{}' cannot render {}, using {}",
                format, date, FALLBACK_LABEL_FORMAT
            );
            date.format(FALLBACK_LABEL_FORMAT).to_string()
        }
    }
}
