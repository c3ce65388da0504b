//! Relationship account score (Layer 2)
//!
//! Turns sparse daily activity logs into a dense, exponentially smoothed
//! daily score series and derives simple trend signals from it.

#![warn(missing_docs)]

pub mod aggregator;
pub mod config;
pub mod insight;
pub mod range;

pub use aggregator::{
    compute_score_series, compute_score_series_with, latest_value, seven_day_delta,
    DEFAULT_LATEST_VALUE,
};
pub use config::ScoreConfig;
pub use insight::{summarize, ScoreSummary, Trend};
pub use range::{parse_date, DateRange};

/// Error type for score operations.
pub type Result<T> = std::result::Result<T, ScoreError>;

/// Input-contract violations, reported at the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// Start date falls after end date
    #[error("start date {start} is after end date {end}")]
    InvertedRange {
        /// Requested start
        start: tandem_core::Date,
        /// Requested end
        end: tandem_core::Date,
    },

    /// Date string is not an ISO calendar date
    #[error("invalid date '{input}': {source}")]
    InvalidDate {
        /// The rejected input
        input: String,
        /// Parser error
        source: chrono::ParseError,
    },
}
