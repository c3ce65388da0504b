//! Record store trait abstraction.

use async_trait::async_trait;
use tandem_core::{
    ActivityFilter, Couple, CoupleId, DailyActivityRecord, MilestoneCompletion, RepairSignal, Time,
    UserId,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Query and write interface over the named record collections.
///
/// All methods take `&self` so a single `Arc<dyn RecordStore>` can serve
/// concurrent reads; backends guard their own state.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // === Activity ===

    /// Save a daily activity record.
    async fn save_activity(&self, record: &DailyActivityRecord) -> Result<()>;

    /// List activity records matching the filter.
    async fn list_activity(&self, filter: &ActivityFilter) -> Result<Vec<DailyActivityRecord>>;

    // === Completion log ===

    /// List a user's completion records, ascending by milestone number.
    async fn list_completions(&self, user_id: &UserId) -> Result<Vec<MilestoneCompletion>>;

    /// Insert a completion keyed on `(user_id, milestone_number)`.
    ///
    /// Returns `true` when the record was inserted and `false` when one
    /// already existed. An existing record is never overwritten, so the
    /// first completion timestamp wins.
    async fn upsert_completion(&self, completion: &MilestoneCompletion) -> Result<bool>;

    // === Repair signals ===

    /// Save a repair request or action.
    async fn save_repair_signal(&self, signal: &RepairSignal) -> Result<()>;

    /// List a couple's repair signals created at or after `since`, oldest first.
    async fn list_repair_signals(
        &self,
        couple_id: &CoupleId,
        since: Time,
    ) -> Result<Vec<RepairSignal>>;

    // === Pairings ===

    /// Save a couple.
    async fn save_couple(&self, couple: &Couple) -> Result<()>;

    /// Load a couple by ID.
    async fn load_couple(&self, id: &CoupleId) -> Result<Option<Couple>>;
}
