//! Elapsed-time values as the users type and read them.
//!
//! Durations are whole minutes internally. On screen they appear either as
//! a bare minute count (under an hour) or as `H:MM`.

/// Zero-pad a number to at least `width` digits.
pub fn pad_zeros(n: i64, width: usize) -> String {
    format!("{:0width$}", n, width = width)
}

/// Format a minute count for display: `45` stays `"45"`, `90` becomes
/// `"1:30"`.
pub fn elapsed_to_string(num_minutes: i64) -> String {
    if num_minutes < 60 {
        num_minutes.to_string()
    } else {
        let hours = num_minutes / 60;
        let minutes = num_minutes - 60 * hours;
        format!("{}:{}", hours, pad_zeros(minutes, 2))
    }
}

/// Parse a user-entered elapsed time.
///
/// Accepts a bare integer number of minutes or an `H:MM` / `HH:MM` value.
/// Anything else (empty string, extra colons, non-numeric parts) yields
/// `None` so the caller can treat the field as "no change" rather than
/// store a wrong number.
pub fn elapsed_from_string(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }

    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [minutes] => minutes.trim().parse().ok(),
        [hours, minutes] => {
            let hours: i64 = hours.trim().parse().ok()?;
            let minutes: i64 = minutes.trim().parse().ok()?;
            Some(60 * hours + minutes)
        }
        _ => None,
    }
}
