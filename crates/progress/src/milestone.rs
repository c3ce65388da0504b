//! Milestone definitions and the ordered milestone table.

use std::collections::HashSet;
use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tandem_core::{CoupleId, Time, UserId};
use tandem_storage::RecordStore;
use crate::{ProgressError, Result};

/// Who is being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairContext {
    /// The user asking for progress
    pub user_id: UserId,

    /// Their couple, if paired
    pub couple_id: Option<CoupleId>,

    /// Their partner, if the couple has one
    pub partner_id: Option<UserId>,
}

impl PairContext {
    /// Context for an unpaired user.
    pub fn solo(user_id: UserId) -> Self {
        Self {
            user_id,
            couple_id: None,
            partner_id: None,
        }
    }
}

/// Counted progress toward a milestone target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Amount achieved
    pub done: u32,

    /// Amount required
    pub target: u32,

    /// Unit label, e.g. "days"
    pub unit: String,
}

impl Progress {
    /// Create progress, capping `done` at `target` for display.
    pub fn new(done: u32, target: u32, unit: impl Into<String>) -> Self {
        Self {
            done: done.min(target),
            target,
            unit: unit.into(),
        }
    }

    /// Whether the target is reached.
    pub fn is_complete(&self) -> bool {
        self.done >= self.target
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} {}", self.done, self.target, self.unit)
    }
}

/// Live result of a completion check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The user satisfies the milestone
    pub user_done: bool,

    /// The partner satisfies the milestone
    pub partner_done: bool,

    /// The user's counted progress
    pub user_progress: Option<Progress>,

    /// The partner's counted progress
    pub partner_progress: Option<Progress>,
}

impl CheckOutcome {
    /// Outcome without counted progress.
    pub fn flags(user_done: bool, partner_done: bool) -> Self {
        Self {
            user_done,
            partner_done,
            ..Default::default()
        }
    }

    /// Whether either member has started without finishing.
    pub fn has_partial_progress(&self) -> bool {
        [&self.user_progress, &self.partner_progress]
            .into_iter()
            .flatten()
            .any(|p| p.done > 0 && !p.is_complete())
    }
}

/// Live check deciding whether a milestone is satisfied.
///
/// Checks read through the store and must not fail: a query error counts
/// as "not done".
#[async_trait]
pub trait CompletionCheck: Send + Sync {
    /// Evaluate the check for the user and their partner.
    async fn check(&self, store: &dyn RecordStore, pair: &PairContext, now: Time) -> CheckOutcome;
}

/// Which copy variant was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyVariant {
    /// Both members are done
    BothDone,
    /// The user is done, the partner is not
    UserDonePartnerNot,
    /// The partner is done, the user is not
    PartnerDoneUserNot,
    /// Neither member is done
    NeitherDone,
    /// Neither is done but someone has started
    BothPartial,
}

impl CopyVariant {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BothDone => "both_done",
            Self::UserDonePartnerNot => "user_done_partner_not",
            Self::PartnerDoneUserNot => "partner_done_user_not",
            Self::NeitherDone => "neither_done",
            Self::BothPartial => "both_partial",
        }
    }
}

/// Messages for each pairing state of a milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneCopy {
    /// Both done
    pub both_done: String,
    /// User done, partner pending
    pub user_done_partner_not: String,
    /// Partner done, user pending
    pub partner_done_user_not: String,
    /// Nobody done
    pub neither_done: String,
    /// Nobody done but progress has started
    #[serde(default)]
    pub both_partial: Option<String>,
}

impl MilestoneCopy {
    /// Create copy without a partial-progress variant.
    pub fn new(
        both_done: impl Into<String>,
        user_done_partner_not: impl Into<String>,
        partner_done_user_not: impl Into<String>,
        neither_done: impl Into<String>,
    ) -> Self {
        Self {
            both_done: both_done.into(),
            user_done_partner_not: user_done_partner_not.into(),
            partner_done_user_not: partner_done_user_not.into(),
            neither_done: neither_done.into(),
            both_partial: None,
        }
    }

    /// Add the partial-progress variant.
    pub fn with_partial(mut self, both_partial: impl Into<String>) -> Self {
        self.both_partial = Some(both_partial.into());
        self
    }

    /// Pick the variant and message for a check outcome.
    pub fn select(&self, outcome: &CheckOutcome) -> (CopyVariant, &str) {
        match (outcome.user_done, outcome.partner_done) {
            (true, true) => (CopyVariant::BothDone, self.both_done.as_str()),
            (true, false) => {
                (CopyVariant::UserDonePartnerNot, self.user_done_partner_not.as_str())
            }
            (false, true) => {
                (CopyVariant::PartnerDoneUserNot, self.partner_done_user_not.as_str())
            }
            (false, false) => match &self.both_partial {
                Some(partial) if outcome.has_partial_progress() => {
                    (CopyVariant::BothPartial, partial.as_str())
                }
                _ => (CopyVariant::NeitherDone, self.neither_done.as_str()),
            },
        }
    }
}

/// One onboarding step.
#[derive(Clone)]
pub struct MilestoneDefinition {
    /// Position in the sequence; unique
    pub number: u32,

    /// Short title
    pub title: String,

    /// What the step asks for
    pub description: String,

    /// Both members must satisfy the check
    pub requires_both: bool,

    /// Live completion check
    pub check: Arc<dyn CompletionCheck>,

    /// Copy per pairing state
    pub copy: MilestoneCopy,
}

impl MilestoneDefinition {
    /// Create a milestone.
    pub fn new(
        number: u32,
        title: impl Into<String>,
        description: impl Into<String>,
        requires_both: bool,
        check: impl CompletionCheck + 'static,
        copy: MilestoneCopy,
    ) -> Self {
        Self {
            number,
            title: title.into(),
            description: description.into(),
            requires_both,
            check: Arc::new(check),
            copy,
        }
    }

    /// Whether an outcome satisfies this milestone's pairing rule.
    ///
    /// Partner state gates only milestones that require both members.
    pub fn is_satisfied(&self, outcome: &CheckOutcome) -> bool {
        if self.requires_both {
            outcome.user_done && outcome.partner_done
        } else {
            outcome.user_done
        }
    }
}

impl std::fmt::Debug for MilestoneDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilestoneDefinition")
            .field("number", &self.number)
            .field("title", &self.title)
            .field("requires_both", &self.requires_both)
            .finish_non_exhaustive()
    }
}

/// Milestones in ascending number order, numbers unique.
#[derive(Debug, Clone)]
pub struct MilestoneTable {
    milestones: Vec<MilestoneDefinition>,
}

impl MilestoneTable {
    /// Sort definitions by number, rejecting duplicates.
    pub fn new(mut milestones: Vec<MilestoneDefinition>) -> Result<Self> {
        milestones.sort_by_key(|m| m.number);
        let mut seen = HashSet::new();
        for milestone in &milestones {
            if !seen.insert(milestone.number) {
                return Err(ProgressError::DuplicateMilestone(milestone.number));
            }
        }
        Ok(Self { milestones })
    }

    /// Milestones in order.
    pub fn iter(&self) -> impl Iterator<Item = &MilestoneDefinition> {
        self.milestones.iter()
    }

    /// Number of milestones.
    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    /// Zero-based position of a milestone number.
    pub fn index_of(&self, number: u32) -> Option<usize> {
        self.milestones.iter().position(|m| m.number == number)
    }

    /// Whether a number belongs to a milestone.
    pub fn contains(&self, number: u32) -> bool {
        self.index_of(number).is_some()
    }
}
