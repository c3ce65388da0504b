//! Follow-up habit selection.

use std::collections::HashSet;
use rand::seq::SliceRandom;
use rand::Rng;
use tandem_core::{HabitSuggestion, MilestoneCompletion};
use crate::config::SequencerConfig;
use crate::{ProgressError, Result};

/// Ordered, non-empty pool of habit suggestions.
///
/// Order matters: earlier entries are simpler, and selection samples from a
/// prefix of the pool.
#[derive(Debug, Clone)]
pub struct HabitPool {
    habits: Vec<HabitSuggestion>,
}

impl HabitPool {
    /// Validate a pool: non-empty with unique ids.
    pub fn new(habits: Vec<HabitSuggestion>) -> Result<Self> {
        if habits.is_empty() {
            return Err(ProgressError::EmptyHabitPool);
        }
        let mut seen = HashSet::new();
        for habit in &habits {
            if !seen.insert(habit.id.as_str()) {
                return Err(ProgressError::DuplicateHabit(habit.id.clone()));
            }
        }
        Ok(Self { habits })
    }

    /// Habits in pool order.
    pub fn iter(&self) -> impl Iterator<Item = &HabitSuggestion> {
        self.habits.iter()
    }

    /// Look up a habit by id.
    pub fn get(&self, id: &str) -> Option<&HabitSuggestion> {
        self.habits.iter().find(|h| h.id == id)
    }

    /// Number of habits.
    pub fn len(&self) -> usize {
        self.habits.len()
    }

    /// Always false; pools are validated non-empty.
    pub fn is_empty(&self) -> bool {
        self.habits.is_empty()
    }
}

/// Id of the most recently completed habit in a completion log.
///
/// Latest `completed_at` wins; ties go to the higher milestone number.
pub fn last_completed_habit(completions: &[MilestoneCompletion]) -> Option<&str> {
    completions
        .iter()
        .filter(|c| c.habit_id().is_some())
        .max_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then_with(|| a.milestone_number.cmp(&b.milestone_number))
        })
        .and_then(|c| c.habit_id())
}

/// Pick a habit, avoiding `exclude`.
///
/// Users with at least `active_density` recent records sample from the first
/// `deep_pool` remaining entries, everyone else from the first `simple_pool`.
/// When excluding leaves nothing the full pool is used. The choice is random;
/// pass a seeded generator for reproducible results.
pub fn select_habit<R: Rng + ?Sized>(
    pool: &HabitPool,
    exclude: Option<&str>,
    recent_records: usize,
    config: &SequencerConfig,
    rng: &mut R,
) -> HabitSuggestion {
    let mut remaining: Vec<&HabitSuggestion> = pool
        .iter()
        .filter(|h| Some(h.id.as_str()) != exclude)
        .collect();
    if remaining.is_empty() {
        remaining = pool.iter().collect();
    }

    let prefix = if recent_records >= config.active_density {
        config.deep_pool
    } else {
        config.simple_pool
    };
    let take = prefix.clamp(1, remaining.len());

    let choice = remaining[..take].choose(rng).copied().unwrap_or(remaining[0]);
    choice.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tandem_core::UserId;

    fn pool(n: usize) -> HabitPool {
        HabitPool::new(
            (0..n)
                .map(|i| {
                    HabitSuggestion::new(format!("h{i}"), format!("Habit {i}"), "", 100 + i as u32)
                })
                .collect(),
        )
        .unwrap()
    }

    fn habit_completion(id: &str, number: u32, hours_ago: i64) -> MilestoneCompletion {
        let completed_at = Utc::now() - Duration::hours(hours_ago);
        MilestoneCompletion::at(UserId::from("alice"), number, completed_at)
            .with_metadata(serde_json::json!({ "habit_id": id }))
    }

    #[test]
    fn test_pool_validation() {
        assert!(matches!(HabitPool::new(vec![]), Err(ProgressError::EmptyHabitPool)));
        let dup = vec![
            HabitSuggestion::new("a", "A", "", 101),
            HabitSuggestion::new("a", "A again", "", 102),
        ];
        assert!(matches!(HabitPool::new(dup), Err(ProgressError::DuplicateHabit(_))));
    }

    #[test]
    fn test_last_completed_habit_by_time() {
        let log = vec![
            MilestoneCompletion::new(UserId::from("alice"), 1),
            habit_completion("h2", 103, 1),
            habit_completion("h0", 101, 48),
        ];
        assert_eq!(last_completed_habit(&log), Some("h2"));
        assert_eq!(last_completed_habit(&log[..1]), None);
    }

    #[test]
    fn test_simple_users_sample_first_three() {
        let pool = pool(7);
        let config = SequencerConfig::default();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let habit = select_habit(&pool, None, 1, &config, &mut rng);
            assert!(["h0", "h1", "h2"].contains(&habit.id.as_str()), "got {}", habit.id);
        }
    }

    #[test]
    fn test_active_users_sample_first_four_remaining() {
        let pool = pool(7);
        let config = SequencerConfig::default();
        let mut seen = HashSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let habit = select_habit(&pool, Some("h1"), 5, &config, &mut rng);
            seen.insert(habit.id);
        }
        let expected: HashSet<String> =
            ["h0", "h2", "h3", "h4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_single_habit_pool_falls_back_to_full_pool() {
        let pool = pool(1);
        let mut rng = StdRng::seed_from_u64(7);
        let habit = select_habit(&pool, Some("h0"), 0, &SequencerConfig::default(), &mut rng);
        assert_eq!(habit.id, "h0");
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let pool = pool(7);
        let config = SequencerConfig::default();
        let a = select_habit(&pool, None, 4, &config, &mut StdRng::seed_from_u64(42));
        let b = select_habit(&pool, None, 4, &config, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
