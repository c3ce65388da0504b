//! Daily activity records - one per user per calendar date.

use serde::{Deserialize, Serialize};
use crate::id::{CoupleId, RecordId, UserId};
use crate::{Date, Time};

/// Number of deposit indicators on a daily record.
pub const DEPOSIT_INDICATORS: u32 = 4;

/// What happened when a partner made (or missed) a bid for connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnTowardOutcome {
    /// The user reached toward their partner.
    Initiated,
    /// The partner's bid was received positively.
    ReceivedPositively,
    /// A bid was missed.
    Missed,
    /// Nothing to report.
    None,
}

impl TurnTowardOutcome {
    /// Whether this outcome counts as a deposit.
    pub fn is_deposit(self) -> bool {
        matches!(self, Self::Initiated | Self::ReceivedPositively)
    }

    /// Wire name of the outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::ReceivedPositively => "received_positively",
            Self::Missed => "missed",
            Self::None => "none",
        }
    }
}

/// Error returned when parsing an unknown turn-toward outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown turn-toward outcome: {0}")]
pub struct UnknownOutcome(pub String);

impl std::str::FromStr for TurnTowardOutcome {
    type Err = UnknownOutcome;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "initiated" => Ok(Self::Initiated),
            "received_positively" => Ok(Self::ReceivedPositively),
            "missed" => Ok(Self::Missed),
            "none" => Ok(Self::None),
            other => Err(UnknownOutcome(other.to_string())),
        }
    }
}

/// A user's log for one calendar day.
///
/// Every indicator is optional: a missing value simply counts as not
/// satisfied when scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyActivityRecord {
    /// Unique identifier
    pub id: RecordId,

    /// Who logged the day
    pub user_id: UserId,

    /// Pairing the user belonged to when logging
    #[serde(default)]
    pub couple_id: Option<CoupleId>,

    /// Calendar date the record covers
    pub date: Date,

    /// Took time to reflect
    #[serde(default)]
    pub reflection: Option<bool>,

    /// Expressed appreciation
    #[serde(default)]
    pub appreciation: Option<bool>,

    /// Structured turn-toward outcomes for the day
    #[serde(default)]
    pub turn_toward: Option<Vec<TurnTowardOutcome>>,

    /// Single free-form turn-toward value written by older clients
    #[serde(default)]
    pub turn_toward_legacy: Option<String>,

    /// Made an adjustment for the partner
    #[serde(default)]
    pub adjustment: Option<bool>,

    /// Relationship climate rating, 1 (stormy) to 5 (sunny)
    #[serde(default)]
    pub climate: Option<u8>,

    /// When the record was written
    pub created_at: Time,
}

impl DailyActivityRecord {
    /// Create an empty record for a user and date.
    pub fn new(user_id: UserId, date: Date) -> Self {
        Self {
            id: RecordId::new(),
            user_id,
            couple_id: None,
            date,
            reflection: None,
            appreciation: None,
            turn_toward: None,
            turn_toward_legacy: None,
            adjustment: None,
            climate: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Set the couple.
    pub fn with_couple(mut self, couple_id: CoupleId) -> Self {
        self.couple_id = Some(couple_id);
        self
    }

    /// Set the reflection flag.
    pub fn with_reflection(mut self, value: bool) -> Self {
        self.reflection = Some(value);
        self
    }

    /// Set the appreciation flag.
    pub fn with_appreciation(mut self, value: bool) -> Self {
        self.appreciation = Some(value);
        self
    }

    /// Add a structured turn-toward outcome.
    pub fn with_turn_toward(mut self, outcome: TurnTowardOutcome) -> Self {
        self.turn_toward.get_or_insert_with(Vec::new).push(outcome);
        self
    }

    /// Set the adjustment flag.
    pub fn with_adjustment(mut self, value: bool) -> Self {
        self.adjustment = Some(value);
        self
    }

    /// Set the climate rating.
    pub fn with_climate(mut self, rating: u8) -> Self {
        self.climate = Some(rating);
        self
    }

    /// Whether the turn-toward indicator is satisfied.
    ///
    /// The structured outcome list wins when present. Otherwise the legacy
    /// single value counts unless it is empty or `"missed"`.
    pub fn turn_toward_satisfied(&self) -> bool {
        match &self.turn_toward {
            Some(outcomes) => outcomes.iter().any(|o| o.is_deposit()),
            None => self
                .turn_toward_legacy
                .as_deref()
                .map(str::trim)
                .is_some_and(|v| !v.is_empty() && !v.eq_ignore_ascii_case("missed")),
        }
    }

    /// Whether the day shows a missed bid for connection.
    pub fn shows_missed_turn(&self) -> bool {
        match &self.turn_toward {
            Some(outcomes) => outcomes.contains(&TurnTowardOutcome::Missed),
            None => self
                .turn_toward_legacy
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("missed")),
        }
    }

    /// Count of satisfied deposit indicators, 0 to [`DEPOSIT_INDICATORS`].
    pub fn deposit_count(&self) -> u32 {
        [
            self.reflection == Some(true),
            self.appreciation == Some(true),
            self.turn_toward_satisfied(),
            self.adjustment == Some(true),
        ]
        .iter()
        .filter(|satisfied| **satisfied)
        .count() as u32
    }

    /// Climate rating if it lies on the 1-5 scale.
    pub fn valid_climate(&self) -> Option<u8> {
        self.climate.filter(|c| (1..=5).contains(c))
    }
}

/// Filter for querying activity records.
///
/// All set fields must match. Results are sorted by date ascending unless
/// `newest_first` is set; `limit` applies after sorting.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Only this user's records
    pub user_id: Option<UserId>,

    /// Only records for this couple
    pub couple_id: Option<CoupleId>,

    /// Skip this user's records
    pub exclude_user: Option<UserId>,

    /// Earliest date, inclusive
    pub date_from: Option<Date>,

    /// Latest date, inclusive
    pub date_to: Option<Date>,

    /// Maximum number of records returned
    pub limit: Option<usize>,

    /// Sort by date descending
    pub newest_first: bool,
}

impl ActivityFilter {
    /// Filter for one user's records.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Restrict to an inclusive date range.
    pub fn between(mut self, from: Date, to: Date) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Restrict to dates on or after `from`.
    pub fn since(mut self, from: Date) -> Self {
        self.date_from = Some(from);
        self
    }

    /// Return newest records first.
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Cap the number of records.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record passes every set field.
    pub fn matches(&self, record: &DailyActivityRecord) -> bool {
        if let Some(user) = &self.user_id {
            if &record.user_id != user {
                return false;
            }
        }
        if let Some(couple) = &self.couple_id {
            if record.couple_id.as_ref() != Some(couple) {
                return false;
            }
        }
        if let Some(excluded) = &self.exclude_user {
            if &record.user_id == excluded {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if record.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if record.date > to {
                return false;
            }
        }
        true
    }

    /// Filter, sort and truncate a set of records.
    pub fn apply(
        &self,
        records: impl IntoIterator<Item = DailyActivityRecord>,
    ) -> Vec<DailyActivityRecord> {
        let mut matched: Vec<_> = records.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));
        if self.newest_first {
            matched.reverse();
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}
