//! Date stamp utilities for exported images.
//!
//! Exports carry a date-only stamp so that two renders of the same deck on
//! the same day are pixel-identical. Nothing in the render path reads the
//! wall clock directly; callers resolve a [`NaiveDate`] once per export.

use chrono::{Local, NaiveDate};

/// Format used for the footer stamp.
pub const DATE_STAMP_FORMAT: &str = "%Y-%m-%d";

/// Resolve the stamp date: an explicit date wins, otherwise today's local date.
pub fn resolve_stamp_date(explicit: Option<NaiveDate>) -> NaiveDate {
    explicit.unwrap_or_else(|| Local::now().date_naive())
}

/// Footer text for a given date, e.g. `"Exported 2024-03-09"`.
pub fn footer_stamp(date: NaiveDate) -> String {
    format!("Exported {}", date.format(DATE_STAMP_FORMAT))
}

/// Parse a `YYYY-MM-DD` date as accepted on the command line.
pub fn parse_stamp_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_STAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_stamp_is_date_only() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(footer_stamp(date), "Exported 2024-03-09");
    }

    #[test]
    fn test_explicit_date_wins() {
        let date = NaiveDate::from_ymd_opt(2001, 1, 31).unwrap();
        assert_eq!(resolve_stamp_date(Some(date)), date);
    }

    #[test]
    fn test_parse_stamp_date() {
        assert_eq!(
            parse_stamp_date(" 2023-12-01 "),
            NaiveDate::from_ymd_opt(2023, 12, 1)
        );
        assert!(parse_stamp_date("12/01/2023").is_none());
    }
}
