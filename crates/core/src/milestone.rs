//! Milestone completion log and habit suggestions.

use serde::{Deserialize, Serialize};
use crate::id::{CompletionId, UserId};
use crate::Time;

/// A persisted record that a user completed a milestone or habit.
///
/// Append-only: keyed by `(user_id, milestone_number)` and never mutated
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneCompletion {
    /// Unique identifier
    pub id: CompletionId,

    /// Who completed it
    pub user_id: UserId,

    /// Milestone (or habit slot) number
    pub milestone_number: u32,

    /// When the completion was first detected
    pub completed_at: Time,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl MilestoneCompletion {
    /// Create a completion stamped with the current time.
    pub fn new(user_id: UserId, milestone_number: u32) -> Self {
        Self::at(user_id, milestone_number, chrono::Utc::now())
    }

    /// Create a completion with an explicit timestamp.
    pub fn at(user_id: UserId, milestone_number: u32, completed_at: Time) -> Self {
        Self {
            id: CompletionId::new(),
            user_id,
            milestone_number,
            completed_at,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Habit id stored in the metadata, if this records a habit.
    pub fn habit_id(&self) -> Option<&str> {
        self.metadata.get("habit_id").and_then(|v| v.as_str())
    }
}

/// A follow-up practice offered once onboarding is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitSuggestion {
    /// Stable identifier, used to avoid repeating the last habit
    pub id: String,

    /// Short title
    pub title: String,

    /// What to do
    pub description: String,

    /// Completion-log number used when the habit is finished
    pub milestone_number: u32,
}

impl HabitSuggestion {
    /// Create a habit suggestion.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        milestone_number: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            milestone_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_habit_id_from_metadata() {
        let completion = MilestoneCompletion::new(UserId::from("alice"), 101)
            .with_metadata(serde_json::json!({"habit_id": "gratitude-walk"}));
        assert_eq!(completion.habit_id(), Some("gratitude-walk"));
    }

    #[test]
    fn test_plain_completion_has_no_habit() {
        let completion = MilestoneCompletion::new(UserId::from("alice"), 1);
        assert_eq!(completion.habit_id(), None);
    }
}
