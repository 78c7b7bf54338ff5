//! Duration parsing utilities.
//!
//! Parses human-readable duration strings like "500ms", "30s", "2m", "1h".

use crate::error::{Error, Result};
use std::time::Duration;

/// Parse a duration string like "500ms", "30s", "2m", "1h".
///
/// A bare number is taken as seconds. Returns `None` if the string cannot be
/// parsed.
///
/// # Examples
///
/// ```
/// use tunnel_manager::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("45s"), Some(Duration::from_secs(45)));
/// assert_eq!(parse_duration_string("250ms"), Some(Duration::from_millis(250)));
/// assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_duration_string("90"), Some(Duration::from_secs(90)));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();

    let (digits, unit): (&str, fn(u64) -> Option<Duration>) =
        if let Some(n) = s.strip_suffix("ms") {
            (n, |v| Some(Duration::from_millis(v)))
        } else if let Some(n) = s.strip_suffix('s') {
            (n, |v| Some(Duration::from_secs(v)))
        } else if let Some(n) = s.strip_suffix('m') {
            (n, |v| v.checked_mul(60).map(Duration::from_secs))
        } else if let Some(n) = s.strip_suffix('h') {
            (n, |v| v.checked_mul(3600).map(Duration::from_secs))
        } else {
            (s, |v| Some(Duration::from_secs(v)))
        };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().and_then(unit)
}

/// Parse a duration setting, naming the field in the error.
pub fn parse_duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration_string(value).ok_or_else(|| {
        Error::Config(format!(
            "'{}' has invalid duration '{}' (expected e.g. \"30s\", \"500ms\", \"2m\")",
            field, value
        ))
    })
}
