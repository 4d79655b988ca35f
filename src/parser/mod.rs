//! Turning fetched forum pages into domain records.

pub mod bitcointalk;

use chrono::{NaiveDate, NaiveDateTime};

use crate::app::{HarvestError, Result};
use crate::domain::{Board, Member, TopicPage};

pub use bitcointalk::BitcointalkParser;

/// Absolute timestamp format used across the forum.
pub const TIMESTAMP_FORMAT: &str = "%B %d, %Y, %I:%M:%S %p";

/// Extracts records from raw HTML documents.
///
/// Any structural surprise is a `Parse` error; parsers never guess.
pub trait EntityParser {
    fn parse_board(&self, html: &str) -> Result<Board>;

    /// Relative "Today at" timestamps resolve against `today`.
    fn parse_profile(&self, html: &str, today: NaiveDate) -> Result<Member>;

    /// One page of a topic: its metadata plus up to twenty messages.
    fn parse_topic_page(&self, html: &str, today: NaiveDate) -> Result<TopicPage>;
}

/// Parse a forum timestamp, resolving a "Today at" prefix against `today`.
pub fn resolve_timestamp(text: &str, today: NaiveDate) -> Result<NaiveDateTime> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let absolute = normalized.replace("Today at", &today.format("%B %d, %Y,").to_string());

    NaiveDateTime::parse_from_str(&absolute, TIMESTAMP_FORMAT)
        .map_err(|e| HarvestError::Parse(format!("Invalid timestamp {:?}: {}", normalized, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_absolute_timestamp() {
        let parsed = resolve_timestamp("December 09, 2009, 07:23:55 PM", date(2014, 7, 29)).unwrap();
        assert_eq!(parsed, date(2009, 12, 9).and_hms_opt(19, 23, 55).unwrap());
    }

    #[test]
    fn test_today_resolves_against_reference_date() {
        let parsed = resolve_timestamp("Today at 12:38:01 AM", date(2014, 7, 29)).unwrap();
        assert_eq!(parsed, date(2014, 7, 29).and_hms_opt(0, 38, 1).unwrap());
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let parsed = resolve_timestamp("  Today   at\n 09:03:11 PM ", date(2014, 7, 29)).unwrap();
        assert_eq!(parsed, date(2014, 7, 29).and_hms_opt(21, 3, 11).unwrap());
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = resolve_timestamp("Yesterday-ish", date(2014, 7, 29)).unwrap_err();
        assert!(matches!(err, HarvestError::Parse(_)));
    }
}
