//! Parsers for the typed accessors of [`ValueTree`](super::ValueTree).
//!
//! Every parser returns the reason for a failure as a plain string; the
//! tree attaches key and value before surfacing it as
//! [`TreeError::InvalidParam`](super::TreeError::InvalidParam).

use std::time::Duration;

const SECOND: u64 = 1000;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;
const TB: f64 = GB * 1024.0;

/// Separator for list-valued parameters.
pub const LIST_SEPARATOR: char = ';';

/// Parses a boolean, accepting `true|yes|on` and `false|no|off`.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err("not a boolean".to_string()),
    }
}

/// Parses a time interval: an integer with optional `s|m|h|d|w` suffix.
///
/// A bare integer is a number of milliseconds.
pub fn parse_time_interval(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    let (digits, unit) = match trimmed.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&trimmed[..idx], Some(c)),
        Some(_) => (trimmed, None),
        None => return Err("empty time interval".to_string()),
    };

    let count: u64 = digits
        .trim()
        .parse()
        .map_err(|_| "not a non-negative integer interval".to_string())?;

    let multiplier = match unit.map(|c| c.to_ascii_lowercase()) {
        None => 1,
        Some('s') => SECOND,
        Some('m') => MINUTE,
        Some('h') => HOUR,
        Some('d') => DAY,
        Some('w') => WEEK,
        Some(other) => return Err(format!("unknown time unit '{other}'")),
    };

    count
        .checked_mul(multiplier)
        .map(Duration::from_millis)
        .ok_or_else(|| "time interval overflows".to_string())
}

/// Parses a byte size: a number with optional `b|kb|mb|gb|tb` suffix.
///
/// Multiples are powers of 1024. Fractions are allowed with a suffix
/// (`1.5gb`) and are rounded to the nearest byte.
pub fn parse_byte_size(value: &str) -> Result<u64, String> {
    let lower = value.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(split);

    let multiplier = match unit.trim() {
        "" | "b" => 1.0,
        "kb" => KB,
        "mb" => MB,
        "gb" => GB,
        "tb" => TB,
        other => return Err(format!("unknown size unit '{other}'")),
    };

    let number = number.trim();
    if let Ok(whole) = number.parse::<u64>() {
        return (whole as f64 * multiplier <= u64::MAX as f64)
            .then(|| whole.saturating_mul(multiplier as u64))
            .ok_or_else(|| "byte size overflows".to_string());
    }

    let fractional: f64 = number
        .parse()
        .map_err(|_| "not a byte size".to_string())?;
    if !fractional.is_finite() || fractional < 0.0 {
        return Err("byte size must be non-negative".to_string());
    }

    let bytes = (fractional * multiplier).round();
    if bytes > u64::MAX as f64 {
        return Err("byte size overflows".to_string());
    }
    Ok(bytes as u64)
}

/// Parses a percentage: a non-negative integer returned as `value / 100`.
pub fn parse_percentage(value: &str) -> Result<f64, String> {
    let whole: u32 = value
        .trim()
        .parse()
        .map_err(|_| "not a non-negative integer percentage".to_string())?;
    Ok(f64::from(whole) / 100.0)
}

/// Splits a `;`-separated list, trimming and dropping empty elements.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins list elements with the list separator.
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}
