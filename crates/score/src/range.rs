//! Boundary validation for score queries.

use tandem_core::Date;
use crate::{Result, ScoreError};

/// An inclusive, validated calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Validate a range; `start` must not be after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self> {
        if start > end {
            return Err(ScoreError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse and validate a range from ISO date strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Range covering `days` days and ending on `end`.
    pub fn ending_on(end: Date, days: u32) -> Self {
        let start = tandem_core::days_before(end, days.saturating_sub(1));
        Self { start, end }
    }

    /// First day.
    pub fn start(&self) -> Date {
        self.start
    }

    /// Last day.
    pub fn end(&self) -> Date {
        self.end
    }

    /// Number of days in the range.
    pub fn days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<Date> {
    Date::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|source| ScoreError::InvalidDate {
        input: input.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_rejected() {
        let err = DateRange::parse("2024-03-10", "2024-03-01").unwrap_err();
        assert!(matches!(err, ScoreError::InvertedRange { .. }));
    }

    #[test]
    fn test_malformed_date_rejected() {
        let err = parse_date("2024-13-01").unwrap_err();
        assert!(err.to_string().contains("2024-13-01"));
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::parse("2024-03-01", "2024-03-01").unwrap();
        assert_eq!(range.days(), 1);
    }

    #[test]
    fn test_ending_on() {
        let end = parse_date("2024-03-10").unwrap();
        let range = DateRange::ending_on(end, 30);
        assert_eq!(range.days(), 30);
        assert_eq!(range.start(), parse_date("2024-02-10").unwrap());
    }
}
