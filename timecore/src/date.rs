//! Calendar date values in `YYYY-MM-DD` form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::elapsed::pad_zeros;

/// A calendar date as a plain (year, month, day) triple.
///
/// No range validation is performed on the fields: a parsed `2024-13-40`
/// carries month 13 and day 40 unchanged. Callers that need real calendar
/// arithmetic should go through chrono; this type only has to order, format
/// and step by whole months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateValue {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateValue {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Parse a `YYYY-MM-DD` string.
    ///
    /// Returns `None` unless the string splits into exactly three numeric
    /// hyphen-separated parts. Out-of-range month/day values are NOT
    /// rejected here; they propagate to the caller.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('-');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { year, month, day })
    }

    /// Copy of this date moved to the first day of its month.
    pub fn first_of_month(&self) -> Self {
        Self { day: 1, ..*self }
    }

    /// Add one calendar month in place. The year rolls at December.
    pub fn add_month(&mut self) {
        if self.month == 12 {
            self.year += 1;
            self.month = 1;
        } else {
            self.month += 1;
        }
    }

    /// Subtract one calendar month in place. The year rolls at January.
    pub fn subtract_month(&mut self) {
        if self.month == 1 {
            self.year -= 1;
            self.month = 12;
        } else {
            self.month -= 1;
        }
    }

    /// The comparison the original system shipped with, kept for
    /// compatibility checks. It falls through to the next field whenever
    /// the current one is not strictly smaller, so a date with a greater
    /// early field but a smaller late field compares wrong: 2024-06-10
    /// counts as "before" 2023-06-15 because the year check falls through
    /// and the day check (10 < 15) fires. Not transitive, not a total
    /// order. New code must use the derived `Ord` instead.
    pub fn legacy_before(&self, other: &Self) -> bool {
        if self.year < other.year {
            true
        } else if self.month < other.month {
            true
        } else {
            self.day < other.day
        }
    }

    /// Mirror image of [`legacy_before`](Self::legacy_before), with the
    /// same fall-through defect.
    pub fn legacy_after(&self, other: &Self) -> bool {
        if self.year > other.year {
            true
        } else if self.month > other.month {
            true
        } else {
            self.day > other.day
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            pad_zeros(self.year as i64, 4),
            pad_zeros(self.month as i64, 2),
            pad_zeros(self.day as i64, 2)
        )
    }
}
