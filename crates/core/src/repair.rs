//! Pairings and repair signals.

use serde::{Deserialize, Serialize};
use crate::id::{CoupleId, SignalId, UserId};
use crate::Time;

/// Two users who share a relationship account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Couple {
    /// Unique identifier
    pub id: CoupleId,

    /// Members of the pairing
    pub members: Vec<UserId>,
}

impl Couple {
    /// Create a couple.
    pub fn new(id: CoupleId, members: Vec<UserId>) -> Self {
        Self { id, members }
    }

    /// The first member who is not `user`.
    pub fn partner_of(&self, user: &UserId) -> Option<&UserId> {
        self.members.iter().find(|m| *m != user)
    }
}

/// Kind of repair signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairSignalKind {
    /// Asked the partner to repair after a conflict
    Request,
    /// Logged a repair attempt
    Action,
}

/// A repair request or repair action within a couple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairSignal {
    /// Unique identifier
    pub id: SignalId,

    /// Couple the signal belongs to
    pub couple_id: CoupleId,

    /// Who raised it
    pub user_id: UserId,

    /// Request or action
    pub kind: RepairSignalKind,

    /// When it was raised
    pub created_at: Time,

    /// Optional note
    #[serde(default)]
    pub note: Option<String>,
}

impl RepairSignal {
    /// Create a signal at an explicit time.
    pub fn at(
        couple_id: CoupleId,
        user_id: UserId,
        kind: RepairSignalKind,
        created_at: Time,
    ) -> Self {
        Self {
            id: SignalId::new(),
            couple_id,
            user_id,
            kind,
            created_at,
            note: None,
        }
    }

    /// Create a signal stamped with the current time.
    pub fn new(couple_id: CoupleId, user_id: UserId, kind: RepairSignalKind) -> Self {
        Self::at(couple_id, user_id, kind, chrono::Utc::now())
    }
}
