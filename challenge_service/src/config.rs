//! Configuration Management
//!
//! Configuration is read once from the environment at startup and passed
//! into the components that need it; nothing reads environment variables
//! after boot.
//!
//! ## Configuration Variables
//!
//! - `DATABASE_URL`: Path to SQLite database file (default: `challenge.db`)
//! - `BIND_ADDRESS`: HTTP server bind address (default: `0.0.0.0:3000`)
//! - `NATIONAL_GOAL`: Total target minutes for the whole challenge
//!   (default: `100000`)
//! - `START_DATE`: Optional `YYYY-MM-DD` first navigable calendar date
//! - `END_DATE`: Optional `YYYY-MM-DD` last navigable calendar date

use tracing::warn;

use timecore::DateValue;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub national_goal: i64,
    pub start_date: Option<DateValue>,
    pub end_date: Option<DateValue>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "challenge.db".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            national_goal: 100_000,
            start_date: None,
            end_date: None,
        }
    }
}

impl Config {
    /// Read the configuration from environment variables, falling back to
    /// the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let national_goal = match std::env::var("NATIONAL_GOAL") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = raw.as_str(), "Invalid NATIONAL_GOAL, using default");
                defaults.national_goal
            }),
            Err(_) => defaults.national_goal,
        };

        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            national_goal,
            start_date: date_from_env("START_DATE"),
            end_date: date_from_env("END_DATE"),
        }
    }
}

fn date_from_env(name: &str) -> Option<DateValue> {
    let raw = std::env::var(name).ok()?;
    let parsed = DateValue::parse(&raw);
    if parsed.is_none() {
        warn!(variable = name, value = raw.as_str(), "Ignoring unparseable date");
    }
    parsed
}
