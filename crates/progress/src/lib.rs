//! Progress Sequencing (Layer 3)
//!
//! Onboarding milestones, override triggers and follow-up habit selection.
//! Every evaluation is a fresh, stateless pass over data read from a
//! [`RecordStore`](tandem_storage::RecordStore).

#![warn(missing_docs)]

pub mod config;
pub mod milestone;
pub mod checks;
pub mod catalog;
pub mod trigger;
pub mod habit;
pub mod sequencer;

pub use config::SequencerConfig;
pub use milestone::{
    CheckOutcome, CompletionCheck, CopyVariant, MilestoneCopy, MilestoneDefinition, MilestoneTable,
    PairContext, Progress,
};
pub use checks::{ActivityLogged, Indicator, IndicatorDays, RepairLogged};
pub use catalog::{default_habits, default_milestones, HABIT_NUMBER_BASE};
pub use trigger::{evaluate_override, OverrideReason};
pub use habit::{last_completed_habit, select_habit, HabitPool};
pub use sequencer::{
    MilestoneStatus, MilestoneSummary, ProgressEvaluation, ProgressEvaluator, ProgressSequencer,
    ProgressState,
};

/// Error type for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors raised while configuring the sequencer or awaiting its writes.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Two milestones share a number
    #[error("duplicate milestone number: {0}")]
    DuplicateMilestone(u32),

    /// Two habits share an id
    #[error("duplicate habit id: {0}")]
    DuplicateHabit(String),

    /// The habit pool has no entries
    #[error("habit pool is empty")]
    EmptyHabitPool,

    /// A habit's completion number overlaps a milestone number
    #[error("habit '{habit}' uses milestone number {number}")]
    HabitNumberCollision {
        /// Habit id
        habit: String,
        /// Conflicting number
        number: u32,
    },

    /// No habit with this id in the pool
    #[error("unknown habit: {0}")]
    UnknownHabit(String),

    /// Record store failure
    #[error("storage error: {0}")]
    Storage(#[from] tandem_storage::StorageError),
}
