//! Default onboarding milestones and habit pool.

use crate::checks::{ActivityLogged, Indicator, IndicatorDays, RepairLogged};
use crate::habit::HabitPool;
use crate::milestone::{MilestoneCopy, MilestoneDefinition, MilestoneTable};
use crate::Result;
use tandem_core::HabitSuggestion;

/// First completion-log number used by habits.
pub const HABIT_NUMBER_BASE: u32 = 100;

/// The standard five-step onboarding sequence.
pub fn default_milestones() -> Result<MilestoneTable> {
    MilestoneTable::new(vec![
        MilestoneDefinition::new(
            1,
            "First check-in",
            "Each of you logs one daily check-in.",
            true,
            ActivityLogged { min_records: 1, within_days: None },
            MilestoneCopy::new(
                "You both checked in. Your account is open.",
                "You're in! Invite your partner to log their first check-in.",
                "Your partner checked in. Add yours to open your account.",
                "Log your first daily check-in to get started.",
            ),
        ),
        MilestoneDefinition::new(
            2,
            "Notice the good",
            "Express appreciation on three different days.",
            false,
            IndicatorDays { indicator: Indicator::Appreciation, min_days: 3 },
            MilestoneCopy::new(
                "Three days of appreciation each. Lovely.",
                "Three days of appreciation logged. Nice work.",
                "Your partner is noticing the good. Your turn.",
                "Tell your partner one thing you appreciate today.",
            )
            .with_partial("Keep going: appreciation sticks when it becomes a habit."),
        ),
        MilestoneDefinition::new(
            3,
            "Turn toward",
            "Respond to a bid for connection, or make one.",
            false,
            IndicatorDays { indicator: Indicator::TurnToward, min_days: 1 },
            MilestoneCopy::new(
                "You both turned toward each other.",
                "You turned toward your partner. That counts.",
                "Your partner turned toward you. Can you return the bid?",
                "Watch for a small bid for attention today and turn toward it.",
            ),
        ),
        MilestoneDefinition::new(
            4,
            "Repair",
            "Log a repair attempt after a rough moment.",
            false,
            RepairLogged { min_actions: 1 },
            MilestoneCopy::new(
                "You've both practised repair.",
                "Repair logged. Conflict handled well builds trust.",
                "Your partner made a repair attempt. Acknowledge it.",
                "Next time things get tense, try a repair and log it.",
            ),
        ),
        MilestoneDefinition::new(
            5,
            "Weekly check-in",
            "Both of you log at least three check-ins this week.",
            true,
            ActivityLogged { min_records: 3, within_days: Some(7) },
            MilestoneCopy::new(
                "A full week together. Onboarding complete.",
                "You've kept up this week. Nudge your partner to join you.",
                "Your partner is on a roll this week. Catch up with them.",
                "Check in a few times this week, together.",
            )
            .with_partial("You're both on your way. A few more check-ins this week."),
        ),
    ])
}

/// Habit pool ordered from simple to deep practices.
pub fn default_habits() -> Result<HabitPool> {
    HabitPool::new(vec![
        HabitSuggestion::new(
            "six-second-kiss",
            "Six-second kiss",
            "Greet each other with a kiss that lasts six seconds.",
            HABIT_NUMBER_BASE + 1,
        ),
        HabitSuggestion::new(
            "daily-appreciation",
            "Daily appreciation",
            "Share one specific appreciation every evening.",
            HABIT_NUMBER_BASE + 2,
        ),
        HabitSuggestion::new(
            "reunion-ritual",
            "Reunion ritual",
            "Spend the first ten minutes after work catching up without screens.",
            HABIT_NUMBER_BASE + 3,
        ),
        HabitSuggestion::new(
            "stress-reducing-talk",
            "Stress-reducing conversation",
            "Talk for twenty minutes about stress outside the relationship. Listen, don't fix.",
            HABIT_NUMBER_BASE + 4,
        ),
        HabitSuggestion::new(
            "love-map-questions",
            "Love map questions",
            "Ask each other three open questions about hopes and worries.",
            HABIT_NUMBER_BASE + 5,
        ),
        HabitSuggestion::new(
            "state-of-us",
            "State of the union",
            "Hold a weekly hour to review what went well and one thing to work on.",
            HABIT_NUMBER_BASE + 6,
        ),
        HabitSuggestion::new(
            "dreams-within-conflict",
            "Dreams within conflict",
            "Pick a recurring disagreement and explore the dream behind each position.",
            HABIT_NUMBER_BASE + 7,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let milestones = default_milestones().unwrap();
        assert_eq!(milestones.len(), 5);

        let habits = default_habits().unwrap();
        assert!(habits.iter().all(|h| !milestones.contains(h.milestone_number)));
    }
}
