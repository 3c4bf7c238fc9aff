//! Pure date and duration logic for the practice challenge.
//!
//! No storage or I/O here: the date value type, elapsed-time string
//! conversions, and the month-grid builder used by the calendar views.

mod calendar;
mod date;
mod elapsed;

pub use calendar::{DayCell, build_calendar};
pub use date::DateValue;
pub use elapsed::{elapsed_from_string, elapsed_to_string, pad_zeros};
