//! Incident time extraction and 12-hour normalization.

use std::sync::LazyLock;

use chrono::{Local, NaiveTime, Timelike as _};
use regex::Regex;

/// An `h:mm` / `hh:mm` clock token with an optional AM/PM marker.
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})(?:\s*([AaPp])\.?[Mm]\.?)?").expect("valid regex")
});

/// Returns the first clock token in the text, as written.
#[must_use]
pub fn find_time_token(text: &str) -> Option<&str> {
    TIME_RE.find(text).map(|m| m.as_str())
}

/// Extracts a clock time from the fragment and formats it as
/// `"H:MM AM/PM"`, falling back to the current local time.
#[must_use]
pub fn normalize_time(fragment: &str) -> String {
    normalize_time_at(fragment, Local::now().time())
}

/// Same as [`normalize_time`] with an explicit fallback time.
#[must_use]
pub fn normalize_time_at(fragment: &str, fallback: NaiveTime) -> String {
    parse_time(fragment).unwrap_or_else(|| {
        log::debug!("No usable time in fragment, using current time");
        format_12_hour(fallback.hour(), fallback.minute())
    })
}

/// Parses the first clock token, or `None` when there is none or it is out
/// of range.
fn parse_time(fragment: &str) -> Option<String> {
    let caps = TIME_RE.captures(fragment)?;
    let hour_text = caps.get(1)?.as_str();
    let minute_text = caps.get(2)?.as_str();
    let hour: u32 = hour_text.parse().ok()?;
    let minute: u32 = minute_text.parse().ok()?;

    if let Some(meridiem) = caps.get(3) {
        if !(1..=12).contains(&hour) || minute > 59 {
            return None;
        }
        // Already 12-hour: only the spacing and case change.
        let meridiem = meridiem.as_str().to_uppercase();
        return Some(format!("{hour_text}:{minute_text} {meridiem}M"));
    }

    if hour > 23 || minute > 59 {
        return None;
    }

    Some(format_12_hour(hour, minute))
}

/// Converts a 24-hour clock reading to `"H:MM AM/PM"`.
fn format_12_hour(hour: u32, minute: u32) -> String {
    match hour {
        0 => format!("12:{minute:02} AM"),
        1..=11 => format!("{hour}:{minute:02} AM"),
        12 => format!("12:{minute:02} PM"),
        _ => format!("{}:{minute:02} PM", hour - 12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn converts_24_hour_times() {
        assert_eq!(normalize_time("16:27"), "4:27 PM");
        assert_eq!(normalize_time("00:45"), "12:45 AM");
        assert_eq!(normalize_time("12:30"), "12:30 PM");
        assert_eq!(normalize_time("09:05"), "9:05 AM");
    }

    #[test]
    fn already_12_hour_is_kept() {
        assert_eq!(normalize_time("3:45 PM"), "3:45 PM");
        assert_eq!(normalize_time("Verified at 3:16pm"), "3:16 PM");
        assert_eq!(normalize_time("at 11:02 a.m."), "11:02 AM");
    }

    #[test]
    fn idempotent_on_normalized_output() {
        let once = normalize_time("21:10");
        assert_eq!(normalize_time(&once), once);
    }

    #[test]
    fn falls_back_when_missing() {
        assert_eq!(normalize_time_at("no time here", noon()), "12:00 PM");
    }

    #[test]
    fn falls_back_when_out_of_range() {
        assert_eq!(normalize_time_at("27:15", noon()), "12:00 PM");
        assert_eq!(normalize_time_at("13:15 PM", noon()), "12:00 PM");
    }

    #[test]
    fn fallback_has_no_leading_zero() {
        let early = NaiveTime::from_hms_opt(7, 5, 0).unwrap();
        assert_eq!(normalize_time_at("", early), "7:05 AM");
    }

    #[test]
    fn finds_first_token() {
        assert_eq!(find_time_token("Verified at 3:16 PM"), Some("3:16 PM"));
        assert_eq!(find_time_token("Right Shoulder"), None);
    }
}
