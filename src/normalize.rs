//! Field normalization for lead submissions
//!
//! Pure transformation from the untrusted form body to the record sent to
//! Airtable. Anything that cannot be normalized is omitted rather than sent
//! empty: Airtable rejects blank or malformed date values and unknown select
//! options with HTTP 422.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Number;

use crate::config::LeadConfig;
use crate::lead_models::{LeadSubmission, NormalizedRecord};

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid ISO date regex"));

static DOTTED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\.\s*(\d{1,2})\.\s*(\d{4})$").expect("valid dotted date regex")
});

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("valid time regex")
});

/// Date-time layouts without an offset; the calendar date is taken as written.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%d. %m. %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Normalize a date to `YYYY-MM-DD`.
///
/// Accepts `YYYY-MM-DD` unchanged, rewrites `DD.MM.YYYY`, and otherwise tries
/// a handful of common layouts. Returns `None` for anything that is not a real
/// calendar date.
pub fn normalize_date(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DATE.captures(value) {
        let (y, m, d) = (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        return NaiveDate::from_ymd_opt(y, m, d).map(|_| value.to_string());
    }

    if let Some(caps) = DOTTED_DATE.captures(value) {
        let (d, m, y) = (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        return NaiveDate::from_ymd_opt(y, m, d).map(format_date);
    }

    parse_generic_date(value)
        .filter(|date| (1..=9999).contains(&date.year()))
        .map(format_date)
}

fn parse_generic_date(value: &str) -> Option<NaiveDate> {
    // Offset-aware inputs keep the date of their own offset; converting to UTC
    // first would shift late-evening dates by a day.
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.date_naive());
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Normalize a time to `HH:MM`, dropping seconds.
///
/// Hours must be 0-23 and minutes 0-59.
pub fn normalize_time(raw: &str) -> Option<String> {
    let caps = TIME.captures(raw.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;

    if hour > 23 || minute > 59 {
        return None;
    }

    Some(format!("{:02}:{:02}", hour, minute))
}

/// Explicit name, or first and last name joined with one space.
pub fn compose_name(
    name: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Option<String> {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }

    let parts: Vec<&str> = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Value for a Start/End column.
///
/// Without a valid date nothing is produced: Airtable's date column rejects a
/// bare time.
pub fn compose_datetime(date: Option<&str>, time: Option<&str>, date_only: bool) -> Option<String> {
    let date = date?;
    if date_only {
        return Some(date.to_string());
    }

    match time.and_then(normalize_time) {
        Some(time) => Some(format!("{} {}", date, time)),
        None => Some(date.to_string()),
    }
}

/// Parse an attendee count. Whole values become integers.
pub fn parse_attendees(raw: &str) -> Option<Number> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(whole) = value.parse::<i64>() {
        return Some(Number::from(whole));
    }

    let parsed: f64 = value.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    if parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
        return Some(Number::from(parsed as i64));
    }
    Number::from_f64(parsed)
}

/// Build the outbound record for one submission.
///
/// `now` is only used when a creation-time column is configured.
pub fn normalize_submission(
    submission: &LeadSubmission,
    config: &LeadConfig,
    now: DateTime<Utc>,
) -> NormalizedRecord {
    let columns = &config.columns;
    let mut record = NormalizedRecord::new();

    record.insert_opt_text(
        &columns.name,
        compose_name(
            submission.get_name().as_deref(),
            submission.get_first_name().as_deref(),
            submission.get_last_name().as_deref(),
        ),
    );
    record.insert_opt_text(&columns.email, submission.get_email());
    record.insert_opt_text(&columns.phone, submission.get_phone());

    let date = submission.get_date().as_deref().and_then(normalize_date);
    if let Some(date) = &date {
        record.insert_text(&columns.date, date);
    } else if submission.get_date().is_some_and(|d| !d.trim().is_empty()) {
        tracing::info!("Omitting unrecognized event date");
    }

    record.insert_opt_text(
        &columns.start,
        compose_datetime(
            date.as_deref(),
            submission.get_start_time().as_deref(),
            config.start_date_only,
        ),
    );
    record.insert_opt_text(
        &columns.end,
        compose_datetime(
            date.as_deref(),
            submission.get_end_time().as_deref(),
            config.end_date_only,
        ),
    );

    record.insert_opt_text(&columns.venue, submission.get_venue());
    config
        .event_type
        .apply(submission.get_event_type().as_deref(), &mut record);

    if let Some(count) = submission.get_attendees().as_deref().and_then(parse_attendees) {
        record.insert_number(&columns.attendees, count);
    }

    config
        .lead_source
        .apply(submission.get_source().as_deref(), &mut record);
    record.insert_opt_text(&columns.note, submission.get_note());
    record.insert_opt_text(&columns.user_agent, submission.get_user_agent());
    record.insert_opt_text(&columns.referer, submission.get_referer());

    if let Some(column) = &columns.created_at {
        record.insert_text(column, now.to_rfc3339());
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_date_unchanged() {
        assert_eq!(normalize_date("2025-06-01"), Some("2025-06-01".to_string()));
        assert_eq!(normalize_date(" 2024-02-29 "), Some("2024-02-29".to_string()));
        assert_eq!(normalize_date("2025-02-29"), None);
        assert_eq!(normalize_date("2025-13-01"), None);
    }

    #[test]
    fn test_dotted_date() {
        assert_eq!(normalize_date("25.12.2025"), Some("2025-12-25".to_string()));
        assert_eq!(normalize_date("1.6.2025"), Some("2025-06-01".to_string()));
        assert_eq!(normalize_date("1. 6. 2025"), Some("2025-06-01".to_string()));
        assert_eq!(normalize_date("31.04.2025"), None);
    }

    #[test]
    fn test_generic_dates() {
        assert_eq!(
            normalize_date("2025-06-01T23:30:00-05:00"),
            Some("2025-06-01".to_string())
        );
        assert_eq!(
            normalize_date("2025-06-01T14:00"),
            Some("2025-06-01".to_string())
        );
        assert_eq!(
            normalize_date("Sun, 01 Jun 2025 10:00:00 +0200"),
            Some("2025-06-01".to_string())
        );
        assert_eq!(normalize_date("2025/06/01"), Some("2025-06-01".to_string()));
        assert_eq!(normalize_date("June 1, 2025"), Some("2025-06-01".to_string()));
        assert_eq!(normalize_date("1 June 2025"), Some("2025-06-01".to_string()));
    }

    #[test]
    fn test_garbage_dates() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("next saturday"), None);
        assert_eq!(normalize_date("2025-06"), None);
        assert_eq!(normalize_date("14:00"), None);
    }

    #[test]
    fn test_times() {
        assert_eq!(normalize_time("14:00"), Some("14:00".to_string()));
        assert_eq!(normalize_time("09:30:15"), Some("09:30".to_string()));
        assert_eq!(normalize_time("9:05"), Some("09:05".to_string()));
        assert_eq!(normalize_time("00:00"), Some("00:00".to_string()));
        assert_eq!(normalize_time("23:59"), Some("23:59".to_string()));
        assert_eq!(normalize_time("24:10"), None);
        assert_eq!(normalize_time("12:60"), None);
        assert_eq!(normalize_time("noon"), None);
        assert_eq!(normalize_time("1400"), None);
    }

    #[test]
    fn test_compose_name() {
        assert_eq!(
            compose_name(Some(" Jana Nováková "), Some("X"), None),
            Some("Jana Nováková".to_string())
        );
        assert_eq!(
            compose_name(Some("  "), Some("Jana"), Some(" Nováková")),
            Some("Jana Nováková".to_string())
        );
        assert_eq!(
            compose_name(None, None, Some("Nováková")),
            Some("Nováková".to_string())
        );
        assert_eq!(compose_name(None, Some(" "), None), None);
    }

    #[test]
    fn test_compose_datetime() {
        assert_eq!(
            compose_datetime(Some("2025-06-01"), Some("14:00"), false),
            Some("2025-06-01 14:00".to_string())
        );
        assert_eq!(
            compose_datetime(Some("2025-06-01"), Some("14:00"), true),
            Some("2025-06-01".to_string())
        );
        assert_eq!(
            compose_datetime(Some("2025-06-01"), Some("25:00"), false),
            Some("2025-06-01".to_string())
        );
        assert_eq!(compose_datetime(None, Some("14:00"), false), None);
    }

    #[test]
    fn test_attendees() {
        assert_eq!(parse_attendees("80"), Some(Number::from(80)));
        assert_eq!(parse_attendees(" 120 "), Some(Number::from(120)));
        assert_eq!(parse_attendees("1e2"), Some(Number::from(100)));
        assert_eq!(parse_attendees("12.5"), Number::from_f64(12.5));
        assert_eq!(parse_attendees("about 50"), None);
        assert_eq!(parse_attendees("NaN"), None);
        assert_eq!(parse_attendees("inf"), None);
        assert_eq!(parse_attendees(""), None);
    }
}
