//! Calendar Month Views
//!
//! Assembles the "enter times" calendar: the month grid from `timecore`
//! merged with the participant's recorded minutes, plus the navigation
//! metadata (previous/next month, navigable range clamping, display
//! label).

use serde::Serialize;

use timecore::{DateValue, build_calendar, elapsed_to_string};

use crate::config::Config;
use crate::timestore::TimeStore;

pub type Result<T> = crate::database::Result<T>;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One cell of the annotated calendar. `num_minutes` is the display form
/// of the recorded time, absent for out-of-month cells and for dates with
/// nothing (or zero) recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarCell {
    pub is_cur_month: bool,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub num_minutes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub date_label: String,
    pub current: MonthRef,
    pub previous: MonthRef,
    pub next: MonthRef,
    pub can_go_previous: bool,
    pub can_go_next: bool,
    pub weeks: Vec<Vec<CalendarCell>>,
}

#[derive(Clone)]
pub struct MonthViewBuilder {
    store: TimeStore,
    start_date: Option<DateValue>,
    end_date: Option<DateValue>,
}

impl MonthViewBuilder {
    pub fn new(store: TimeStore, config: &Config) -> Self {
        Self {
            store,
            start_date: config.start_date,
            end_date: config.end_date,
        }
    }

    /// Build the full month view for a participant, clamping the requested
    /// month into the configured navigable range.
    pub async fn build(&self, year: i32, month: u32, participant_id: i64) -> Result<MonthView> {
        let mut cur = DateValue::new(year, month, 1);

        // A month before the configured start moves forward to the start
        // month; a month running past the end moves to the end month.
        if let Some(start) = self.start_date {
            if start > cur {
                cur = start.first_of_month();
            }
        }
        if let Some(end) = self.end_date {
            let mut next = cur;
            next.add_month();
            if next >= end {
                cur = end.first_of_month();
            }
        }

        let mut previous = cur;
        previous.subtract_month();
        let mut next = cur;
        next.add_month();

        let can_go_previous = match self.start_date {
            Some(start) => !(start > previous),
            None => true,
        };
        let can_go_next = match self.end_date {
            Some(end) => !(next > end),
            None => true,
        };

        let month_name = cur
            .month
            .checked_sub(1)
            .and_then(|i| MONTH_NAMES.get(i as usize))
            .copied()
            .unwrap_or("");
        let date_label = format!("{} {}", month_name, cur.year);

        let weeks = self
            .annotated_rows(cur.year, cur.month, participant_id)
            .await?;

        Ok(MonthView {
            date_label,
            current: MonthRef {
                year: cur.year,
                month: cur.month,
            },
            previous: MonthRef {
                year: previous.year,
                month: previous.month,
            },
            next: MonthRef {
                year: next.year,
                month: next.month,
            },
            can_go_previous,
            can_go_next,
            weeks,
        })
    }

    /// The week rows for the given month, annotated with the participant's
    /// recorded times.
    pub async fn annotated_rows(
        &self,
        year: i32,
        month: u32,
        participant_id: i64,
    ) -> Result<Vec<Vec<CalendarCell>>> {
        // Fetch the whole target month. The range runs to the first day of
        // the following month; that extra day never matters because only
        // in-month cells get annotated.
        let range_start = DateValue::new(year, month, 1);
        let mut range_end = range_start;
        range_end.add_month();

        let times = self
            .store
            .get_range(
                participant_id,
                &range_start.to_string(),
                &range_end.to_string(),
            )
            .await?;

        let rows = build_calendar(year, month)
            .into_iter()
            .map(|week| {
                week.into_iter()
                    .map(|cell| {
                        let num_minutes = if cell.is_cur_month {
                            let key =
                                DateValue::new(cell.year, cell.month, cell.day).to_string();
                            // A recorded zero renders as unrecorded.
                            times
                                .get(&key)
                                .filter(|&&minutes| minutes > 0)
                                .map(|&minutes| elapsed_to_string(minutes))
                        } else {
                            None
                        };

                        CalendarCell {
                            is_cur_month: cell.is_cur_month,
                            year: cell.year,
                            month: cell.month,
                            day: cell.day,
                            num_minutes,
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(rows)
    }
}
