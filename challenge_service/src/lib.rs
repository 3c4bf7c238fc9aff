mod api;
mod charts;
mod config;
mod database;
mod month_view;
mod session;
mod timestore;

pub use api::{AppState, routes};
pub use charts::{Chart, ChartCalc};
pub use config::Config;
pub use database::{
    BranchRow, Database, DatabaseError, ParticipantRow, Slot, TimesRow, UserRow,
};
pub use month_view::{CalendarCell, MonthRef, MonthView, MonthViewBuilder};
pub use session::Identity;
pub use timestore::{ParticipantTotal, TimeStore};
