//! Progress sequencing service.
//!
//! Resolves, on every call, whether a user should see an override prompt,
//! their next incomplete milestone, or a follow-up habit. Nothing is cached
//! between calls; the only write is the idempotent completion upsert.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tandem_core::{
    days_before, ActivityFilter, CoupleId, HabitSuggestion, MilestoneCompletion, Time, UserId,
};
use tandem_storage::RecordStore;
use tracing::{debug, info, warn};
use crate::config::SequencerConfig;
use crate::habit::{last_completed_habit, select_habit, HabitPool};
use crate::milestone::{CheckOutcome, CopyVariant, MilestoneDefinition, MilestoneTable, PairContext};
use crate::trigger::{evaluate_override, OverrideReason};
use crate::{ProgressError, Result};

/// Progress evaluation service.
#[async_trait]
pub trait ProgressEvaluator: Send + Sync {
    /// Evaluate a user's progress as of now.
    async fn evaluate_progress(
        &self,
        user_id: &UserId,
        couple_id: Option<&CoupleId>,
    ) -> ProgressEvaluation;
}

/// What the user should see next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressState {
    /// Recent conflict signals take priority over milestones
    OverrideActive,
    /// Working on a milestone
    InProgress {
        /// Milestone number
        milestone: u32,
    },
    /// Onboarding finished; a habit is suggested
    AllComplete,
}

/// Display fields of a milestone.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneSummary {
    /// Milestone number
    pub number: u32,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Both members must complete it
    pub requires_both: bool,
}

impl From<&MilestoneDefinition> for MilestoneSummary {
    fn from(m: &MilestoneDefinition) -> Self {
        Self {
            number: m.number,
            title: m.title.clone(),
            description: m.description.clone(),
            requires_both: m.requires_both,
        }
    }
}

/// Pairwise status of the current milestone.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneStatus {
    /// The user has done their part
    pub user_done: bool,
    /// The partner has done their part
    pub partner_done: bool,
    /// Counted progress, e.g. "2/3 days"
    pub progress: Option<String>,
    /// Message for the pairing state
    pub message: String,
    /// Which copy variant the message came from
    pub variant: CopyVariant,
}

/// Result of one progress evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvaluation {
    /// Resolved state
    pub state: ProgressState,
    /// First incomplete milestone, if any
    pub current_milestone: Option<MilestoneSummary>,
    /// Its pairwise status
    pub status: Option<MilestoneStatus>,
    /// Whether any override trigger fired
    pub override_active: bool,
    /// Triggers that fired
    pub override_reasons: Vec<OverrideReason>,
    /// Suggested habit once all milestones are complete
    pub habit_suggestion: Option<HabitSuggestion>,
    /// Number of milestones
    pub total_milestones: usize,
    /// Zero-based index of the current milestone; equals the total when done
    pub current_index: usize,
}

/// Evaluates onboarding progress against a record store.
pub struct ProgressSequencer {
    store: Arc<dyn RecordStore>,
    milestones: MilestoneTable,
    habits: HabitPool,
    config: SequencerConfig,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl ProgressSequencer {
    /// Create a sequencer. Habit completion numbers must not collide with
    /// milestone numbers.
    pub fn new(
        store: Arc<dyn RecordStore>,
        milestones: MilestoneTable,
        habits: HabitPool,
    ) -> Result<Self> {
        if let Some(habit) = habits.iter().find(|h| milestones.contains(h.milestone_number)) {
            return Err(ProgressError::HabitNumberCollision {
                habit: habit.id.clone(),
                number: habit.milestone_number,
            });
        }

        Ok(Self {
            store,
            milestones,
            habits,
            config: SequencerConfig::default(),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
        })
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the random source used for habit selection.
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// The milestone table.
    pub fn milestones(&self) -> &MilestoneTable {
        &self.milestones
    }

    /// The habit pool.
    pub fn habits(&self) -> &HabitPool {
        &self.habits
    }

    /// Evaluate progress at an explicit point in time.
    pub async fn evaluate_progress_at(
        &self,
        user_id: &UserId,
        couple_id: Option<&CoupleId>,
        now: Time,
    ) -> ProgressEvaluation {
        let pair = self.resolve_pair(user_id, couple_id).await;
        let completions = self.completions(user_id).await;
        let completed: HashSet<u32> = completions.iter().map(|c| c.milestone_number).collect();
        let pending: Vec<&MilestoneDefinition> = self
            .milestones
            .iter()
            .filter(|m| !completed.contains(&m.number))
            .collect();

        let (reasons, prefetched) = futures::join!(
            evaluate_override(self.store.as_ref(), &self.config, &pair, now),
            self.prefetch(&pending, &pair, now)
        );
        let current = self.scan(&pending, prefetched, &pair, now).await;

        let override_active = !reasons.is_empty();
        let total = self.milestones.len();

        let Some((milestone, outcome)) = current else {
            let habit = self.suggest_habit(&pair, &completions, now).await;
            return ProgressEvaluation {
                state: ProgressState::AllComplete,
                current_milestone: None,
                status: None,
                override_active,
                override_reasons: reasons,
                habit_suggestion: Some(habit),
                total_milestones: total,
                current_index: total,
            };
        };

        let (variant, message) = milestone.copy.select(&outcome);
        let status = MilestoneStatus {
            user_done: outcome.user_done,
            partner_done: outcome.partner_done,
            progress: outcome.user_progress.as_ref().map(|p| p.to_string()),
            message: message.to_string(),
            variant,
        };
        let state = if override_active {
            ProgressState::OverrideActive
        } else {
            ProgressState::InProgress { milestone: milestone.number }
        };

        ProgressEvaluation {
            state,
            current_milestone: Some(MilestoneSummary::from(milestone)),
            status: Some(status),
            override_active,
            override_reasons: reasons,
            habit_suggestion: None,
            total_milestones: total,
            current_index: self.milestones.index_of(milestone.number).unwrap_or(total),
        }
    }

    /// Record that the user finished a habit from the pool.
    ///
    /// Returns whether a new completion was written. Unlike milestone
    /// completions, write failures here are returned to the caller.
    pub async fn record_habit_completion(&self, user_id: &UserId, habit_id: &str) -> Result<bool> {
        let habit = self
            .habits
            .get(habit_id)
            .ok_or_else(|| ProgressError::UnknownHabit(habit_id.to_string()))?;
        let completion = MilestoneCompletion::new(user_id.clone(), habit.milestone_number)
            .with_metadata(serde_json::json!({ "habit_id": habit.id }));
        Ok(self.store.upsert_completion(&completion).await?)
    }

    /// Run every pending check concurrently when prefetch is enabled.
    async fn prefetch(
        &self,
        pending: &[&MilestoneDefinition],
        pair: &PairContext,
        now: Time,
    ) -> Option<Vec<CheckOutcome>> {
        if !self.config.prefetch {
            return None;
        }
        let store = self.store.as_ref();
        let checks = pending.iter().map(|m| m.check.check(store, pair, now));
        Some(futures::future::join_all(checks).await)
    }

    /// Walk pending milestones in ascending order, recording the satisfied
    /// ones, and return the first that is not satisfied.
    async fn scan<'a>(
        &self,
        pending: &[&'a MilestoneDefinition],
        prefetched: Option<Vec<CheckOutcome>>,
        pair: &PairContext,
        now: Time,
    ) -> Option<(&'a MilestoneDefinition, CheckOutcome)> {
        let mut prefetched = prefetched.map(|outcomes| outcomes.into_iter());

        for milestone in pending.iter().copied() {
            let outcome = match prefetched.as_mut().and_then(|it| it.next()) {
                Some(outcome) => outcome,
                None => milestone.check.check(self.store.as_ref(), pair, now).await,
            };
            debug!(
                user = %pair.user_id,
                milestone = milestone.number,
                user_done = outcome.user_done,
                partner_done = outcome.partner_done,
                "milestone checked"
            );

            if !milestone.is_satisfied(&outcome) {
                return Some((milestone, outcome));
            }
            self.record_completion(pair, milestone, now).await;
        }
        None
    }

    /// Best-effort idempotent completion write.
    async fn record_completion(
        &self,
        pair: &PairContext,
        milestone: &MilestoneDefinition,
        now: Time,
    ) {
        let metadata = serde_json::json!({
            "title": milestone.title,
            "requires_both": milestone.requires_both,
        });
        let completion = MilestoneCompletion::at(pair.user_id.clone(), milestone.number, now)
            .with_metadata(metadata);

        match self.store.upsert_completion(&completion).await {
            Ok(true) => {
                info!(user = %pair.user_id, milestone = milestone.number, "milestone completed")
            }
            Ok(false) => debug!(
                user = %pair.user_id,
                milestone = milestone.number,
                "completion already recorded"
            ),
            Err(e) => warn!(
                user = %pair.user_id,
                milestone = milestone.number,
                error = %e,
                "failed to record milestone completion; continuing"
            ),
        }
    }

    async fn resolve_pair(&self, user_id: &UserId, couple_id: Option<&CoupleId>) -> PairContext {
        let Some(couple_id) = couple_id else {
            return PairContext::solo(user_id.clone());
        };

        let partner_id = match self.store.load_couple(couple_id).await {
            Ok(Some(couple)) => couple.partner_of(user_id).cloned(),
            Ok(None) => self.partner_from_activity(user_id, couple_id).await,
            Err(e) => {
                warn!(couple = %couple_id, error = %e, "couple lookup failed; no partner");
                None
            }
        };

        PairContext {
            user_id: user_id.clone(),
            couple_id: Some(couple_id.clone()),
            partner_id,
        }
    }

    /// Find the partner through activity logged under the couple by anyone
    /// other than the user.
    async fn partner_from_activity(
        &self,
        user_id: &UserId,
        couple_id: &CoupleId,
    ) -> Option<UserId> {
        let filter = ActivityFilter {
            couple_id: Some(couple_id.clone()),
            exclude_user: Some(user_id.clone()),
            ..Default::default()
        }
        .newest_first()
        .limit(1);

        match self.store.list_activity(&filter).await {
            Ok(records) => records.into_iter().next().map(|r| r.user_id),
            Err(e) => {
                warn!(couple = %couple_id, error = %e, "partner lookup failed");
                None
            }
        }
    }

    async fn completions(&self, user_id: &UserId) -> Vec<MilestoneCompletion> {
        match self.store.list_completions(user_id).await {
            Ok(completions) => completions,
            Err(e) => {
                warn!(user = %user_id, error = %e, "completion log query failed; assuming empty");
                Vec::new()
            }
        }
    }

    async fn suggest_habit(
        &self,
        pair: &PairContext,
        completions: &[MilestoneCompletion],
        now: Time,
    ) -> HabitSuggestion {
        let today = now.date_naive();
        let filter = ActivityFilter::for_user(pair.user_id.clone())
            .between(days_before(today, self.config.density_window_days), today);
        let density = match self.store.list_activity(&filter).await {
            Ok(records) => records.len(),
            Err(e) => {
                warn!(user = %pair.user_id, error = %e, "density query failed; assuming inactive");
                0
            }
        };

        let exclude = last_completed_habit(completions);
        let habit = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            select_habit(&self.habits, exclude, density, &self.config, &mut **rng)
        };
        debug!(user = %pair.user_id, habit = %habit.id, density, ?exclude, "habit selected");
        habit
    }
}

#[async_trait]
impl ProgressEvaluator for ProgressSequencer {
    async fn evaluate_progress(
        &self,
        user_id: &UserId,
        couple_id: Option<&CoupleId>,
    ) -> ProgressEvaluation {
        self.evaluate_progress_at(user_id, couple_id, Utc::now()).await
    }
}
