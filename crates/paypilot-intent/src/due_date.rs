//! Due-date expression parsing.
//!
//! Recognizes "due in N days", "in 2 weeks", "tomorrow", "today" and ISO
//! `YYYY-MM-DD` dates. Relative expressions resolve against the supplied
//! `now`; ISO dates resolve to midnight UTC.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;

fn relative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:due\s+)?(?:in|within)\s+(\d{1,3})\s+(days?|weeks?)\b")
            .expect("Invalid relative due regex")
    })
}

fn tomorrow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\btomorrow\b").expect("Invalid tomorrow regex"))
}

fn today_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bdue\s+today\b").expect("Invalid today regex"))
}

pub(crate) fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("Invalid ISO date regex")
    })
}

/// Extract a due date from free text, if one is stated.
pub fn parse_due_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(caps) = relative_re().captures(text) {
        let n: i64 = caps[1].parse().ok()?;
        let unit = caps[2].to_ascii_lowercase();
        let days = if unit.starts_with("week") { n * 7 } else { n };
        return Some(now + Duration::days(days));
    }

    if let Some(caps) = iso_date_re().captures(text) {
        if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
            return Some(midnight_utc(date));
        }
    }

    if tomorrow_re().is_match(text) {
        return Some(now + Duration::days(1));
    }

    if today_re().is_match(text) {
        return Some(now);
    }

    None
}

/// Parse a date string returned by a provider.
///
/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps.
pub fn parse_date_value(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(midnight_utc)
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}
