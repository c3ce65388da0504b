//! Tandem core data models.
//!
//! This crate defines the records that the relationship-progress core reads
//! and derives: daily activity logs, score points, milestone completions,
//! repair signals and habit suggestions.

#![warn(missing_docs)]

// Core identities
mod id;

// Daily logging
mod activity;
mod score;

// Onboarding and habits
mod milestone;
mod repair;

// Re-exports
pub use id::*;

pub use activity::{
    ActivityFilter, DailyActivityRecord, TurnTowardOutcome, UnknownOutcome, DEPOSIT_INDICATORS,
};
pub use score::ScorePoint;
pub use milestone::{HabitSuggestion, MilestoneCompletion};
pub use repair::{Couple, RepairSignal, RepairSignalKind};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Calendar date type
pub type Date = chrono::NaiveDate;

/// Returns the date `days` calendar days before `date`.
///
/// Saturates at the minimum representable date instead of panicking.
pub fn days_before(date: Date, days: u32) -> Date {
    date.checked_sub_days(chrono::Days::new(days as u64))
        .unwrap_or(chrono::NaiveDate::MIN)
}
