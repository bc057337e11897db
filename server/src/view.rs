// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::aggregate::aggregate;
use crate::calendar::{
    build_month_grid, calendar_link, grid_range, month_label, navigable_month, parse_wire_date,
    CalendarSettings,
};
use crate::error::AppError;
use crate::store::TaskStore;

use calendar_common::{MonthView, Viewer};
use chrono::NaiveDate;
use tracing::debug;

/// Resolves the `date` query parameter. Absent or blank means `today`;
/// anything else must be a valid `YYYY-MM-DD` date.
pub fn resolve_requested_date(requested: Option<&str>, today: NaiveDate) -> Result<NaiveDate, AppError> {
    match requested.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(today),
        Some(raw) => parse_wire_date(raw).map_err(AppError::Validation),
    }
}

/// Builds everything needed to draw one month for `viewer`.
pub async fn render_month(
    store: &dyn TaskStore,
    settings: &CalendarSettings,
    requested: Option<&str>,
    today: NaiveDate,
    viewer: &Viewer,
) -> Result<MonthView, AppError> {
    let current = resolve_requested_date(requested, today)?;

    let grid = build_month_grid(current, settings.grid_policy);
    let (range_start, range_end) = grid_range(&grid)
        .ok_or_else(|| AppError::validation(format!("Cannot build a calendar for {}.", current)))?;

    let prev = navigable_month(current, -1);
    let next = navigable_month(current, 1);

    let tasks_by_date = aggregate(store, range_start, range_end, viewer).await?;
    debug!(
        "Month view for {} covers {} weeks and {} days with tasks",
        current,
        grid.len(),
        tasks_by_date.len()
    );

    Ok(MonthView {
        current,
        month_label: month_label(current, &settings.month_label_format),
        prev_month_link: calendar_link(prev),
        next_month_link: calendar_link(next),
        grid,
        tasks_by_date,
    })
}
