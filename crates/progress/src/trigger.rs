//! Override triggers.
//!
//! Recent conflict signals put a regulation or repair prompt ahead of the
//! normal milestone nudge. The mood check uses a calendar-day window, the
//! missed-turn check samples the latest records regardless of age, and the
//! repair check uses a wall-clock hour window.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tandem_core::{
    days_before, ActivityFilter, DailyActivityRecord, Date, RepairSignalKind, Time,
};
use tandem_storage::RecordStore;
use tracing::{info, warn};
use crate::config::SequencerConfig;
use crate::milestone::PairContext;

/// Why the override is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideReason {
    /// The latest recent record reports a low climate rating
    LowClimate {
        /// Date of the record
        date: Date,
        /// Rating on the 1-5 scale
        rating: u8,
    },

    /// Several of the latest records show missed bids
    MissedTurns {
        /// Records showing a missed turn
        missed: usize,
        /// Records inspected
        sampled: usize,
    },

    /// The partner asked for repair and the user has not responded
    PendingRepairRequest {
        /// When the request was made
        requested_at: Time,
    },
}

/// Evaluate every override trigger for a user.
///
/// Store failures are logged and treated as "no signal". The override is
/// active when the returned list is non-empty.
pub async fn evaluate_override(
    store: &dyn RecordStore,
    config: &SequencerConfig,
    pair: &PairContext,
    now: Time,
) -> Vec<OverrideReason> {
    let (climate, missed, repair) = futures::join!(
        low_climate(store, config, pair, now),
        missed_turns(store, config, pair, now),
        pending_repair(store, config, pair, now)
    );
    let reasons: Vec<OverrideReason> = [climate, missed, repair].into_iter().flatten().collect();

    if !reasons.is_empty() {
        info!(user = %pair.user_id, ?reasons, "override active");
    }
    reasons
}

/// The latest record in the mood window rates the climate as low, given
/// enough records in that window.
async fn low_climate(
    store: &dyn RecordStore,
    config: &SequencerConfig,
    pair: &PairContext,
    now: Time,
) -> Option<OverrideReason> {
    let today = now.date_naive();
    let filter = ActivityFilter::for_user(pair.user_id.clone())
        .between(days_before(today, config.mood_window_days), today)
        .newest_first();
    let recent = activity(store, pair, &filter).await?;

    if recent.len() < config.mood_min_records {
        return None;
    }
    let latest = recent.first()?;
    let rating = latest.valid_climate().filter(|r| *r <= config.low_climate_max)?;
    Some(OverrideReason::LowClimate { date: latest.date, rating })
}

/// Enough of the user's latest records, however old, show a missed bid.
async fn missed_turns(
    store: &dyn RecordStore,
    config: &SequencerConfig,
    pair: &PairContext,
    now: Time,
) -> Option<OverrideReason> {
    if config.missed_min == 0 {
        return None;
    }
    let filter = ActivityFilter {
        date_to: Some(now.date_naive()),
        ..ActivityFilter::for_user(pair.user_id.clone())
    }
    .newest_first()
    .limit(config.missed_sample);
    let sample = activity(store, pair, &filter).await?;

    let missed = sample.iter().filter(|r| r.shows_missed_turn()).count();
    (missed >= config.missed_min).then(|| OverrideReason::MissedTurns {
        missed,
        sampled: sample.len(),
    })
}

async fn activity(
    store: &dyn RecordStore,
    pair: &PairContext,
    filter: &ActivityFilter,
) -> Option<Vec<DailyActivityRecord>> {
    match store.list_activity(filter).await {
        Ok(records) => Some(records),
        Err(e) => {
            warn!(user = %pair.user_id, error = %e, "activity query failed; skipping trigger");
            None
        }
    }
}

async fn pending_repair(
    store: &dyn RecordStore,
    config: &SequencerConfig,
    pair: &PairContext,
    now: Time,
) -> Option<OverrideReason> {
    let couple_id = pair.couple_id.as_ref()?;
    let since = now - Duration::hours(config.repair_window_hours);

    let signals = match store.list_repair_signals(couple_id, since).await {
        Ok(signals) => signals,
        Err(e) => {
            warn!(couple = %couple_id, error = %e, "repair signal query failed; skipping trigger");
            return None;
        }
    };

    let request = signals
        .iter()
        .filter(|s| {
            s.kind == RepairSignalKind::Request && s.user_id != pair.user_id && s.created_at <= now
        })
        .max_by_key(|s| s.created_at)?;

    let answered = signals.iter().any(|s| {
        s.kind == RepairSignalKind::Action
            && s.user_id == pair.user_id
            && s.created_at >= request.created_at
    });

    (!answered).then(|| OverrideReason::PendingRepairRequest {
        requested_at: request.created_at,
    })
}
