//! Common utilities for document generation.
//!
//! Shared helpers for date formatting, file naming and size reporting.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

const FRENCH_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

fn french_month<Tz: TimeZone>(date: &DateTime<Tz>) -> &'static str {
    FRENCH_MONTHS[(date.month0() as usize).min(FRENCH_MONTHS.len() - 1)]
}

/// Long French date, e.g. "16 octobre 2026".
pub fn french_long_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    format!("{} {} {}", date.day(), french_month(date), date.year())
}

/// Long French date with time, e.g. "16 octobre 2026 à 09:05".
pub fn french_long_datetime<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    format!(
        "{} à {:02}:{:02}",
        french_long_date(date),
        date.hour(),
        date.minute()
    )
}

/// Today's date in long French form.
pub fn format_french_date() -> String {
    french_long_date(&Local::now())
}

/// Now, in long French form with hours and minutes.
pub fn format_french_datetime() -> String {
    french_long_datetime(&Local::now())
}

/// Today's date as `dd/mm/yyyy`.
pub fn format_short_date() -> String {
    Local::now().format("%d/%m/%Y").to_string()
}

/// Replace every character outside `[A-Za-z0-9]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

/// Milliseconds since the Unix epoch, used to make file names unique.
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Human-readable size in KiB with two decimals, e.g. "12.34 KB".
pub fn format_kib(len: usize) -> String {
    format!("{:.2} KB", len as f64 / 1024.0)
}
