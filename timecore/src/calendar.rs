//! Month-grid construction for the calendar views.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// One day cell in a month grid.
///
/// Cells outside the target month still carry the real year/month/day of
/// the neighboring month so navigation and display stay consistent; they
/// are flagged with `is_cur_month = false` rather than padded with
/// placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub is_cur_month: bool,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Build the week rows for the given month.
///
/// Weeks start on Monday and always hold exactly seven cells. The first
/// and last rows are filled out with the closing days of the previous
/// month and the opening days of the next one.
///
/// An out-of-range year/month combination yields an empty grid.
pub fn build_calendar(year: i32, month: u32) -> Vec<Vec<DayCell>> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };

    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let Some(first_of_next) = first_of_next else {
        return Vec::new();
    };

    let days_in_month = (first_of_next - first).num_days();
    let leading = first.weekday().num_days_from_monday() as i64;
    // `div_ceil` is feature-gated (`int_roundings`) on this toolchain's stdlib.
    let num_weeks = (leading + days_in_month + 6) / 7;

    let grid_start = first - Duration::days(leading);

    let mut rows = Vec::with_capacity(num_weeks as usize);
    for week in 0..num_weeks {
        let mut row = Vec::with_capacity(7);
        for day in 0..7 {
            let date = grid_start + Duration::days(week * 7 + day);
            row.push(DayCell {
                is_cur_month: date.year() == year && date.month() == month,
                year: date.year(),
                month: date.month(),
                day: date.day(),
            });
        }
        rows.push(row);
    }

    rows
}
