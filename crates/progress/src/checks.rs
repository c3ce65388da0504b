//! Built-in completion checks.
//!
//! Each check counts something per member (records, qualifying days, repair
//! actions) and compares the count with a target. User and partner counts
//! are fetched concurrently.

use std::collections::HashSet;
use async_trait::async_trait;
use chrono::DateTime;
use tandem_core::{
    days_before, ActivityFilter, CoupleId, DailyActivityRecord, RepairSignalKind, Time, UserId,
};
use tandem_storage::RecordStore;
use tracing::warn;
use crate::milestone::{CheckOutcome, CompletionCheck, PairContext, Progress};

/// A deposit indicator on a daily record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Reflection flag set
    Reflection,
    /// Appreciation flag set
    Appreciation,
    /// Turned toward the partner
    TurnToward,
    /// Adjustment flag set
    Adjustment,
}

impl Indicator {
    /// Whether a record satisfies this indicator.
    pub fn satisfied_by(&self, record: &DailyActivityRecord) -> bool {
        match self {
            Self::Reflection => record.reflection == Some(true),
            Self::Appreciation => record.appreciation == Some(true),
            Self::TurnToward => record.turn_toward_satisfied(),
            Self::Adjustment => record.adjustment == Some(true),
        }
    }
}

/// At least `min_records` activity records, optionally within a recent window.
#[derive(Debug, Clone)]
pub struct ActivityLogged {
    /// Records required
    pub min_records: u32,
    /// Only count records from the last N calendar days
    pub within_days: Option<u32>,
}

/// At least `min_days` distinct days on which `indicator` was satisfied.
#[derive(Debug, Clone)]
pub struct IndicatorDays {
    /// Indicator to look for
    pub indicator: Indicator,
    /// Distinct days required
    pub min_days: u32,
}

/// At least `min_actions` repair actions logged within the couple.
#[derive(Debug, Clone)]
pub struct RepairLogged {
    /// Actions required
    pub min_actions: u32,
}

#[async_trait]
impl CompletionCheck for ActivityLogged {
    async fn check(&self, store: &dyn RecordStore, pair: &PairContext, now: Time) -> CheckOutcome {
        let since = self.within_days.map(|days| days_before(now.date_naive(), days));
        let count = |user: UserId| async move {
            let mut filter = ActivityFilter::for_user(user);
            filter.date_from = since;
            activity(store, &filter).await.len() as u32
        };
        counted(self.min_records, "check-ins", pair, count).await
    }
}

#[async_trait]
impl CompletionCheck for IndicatorDays {
    async fn check(&self, store: &dyn RecordStore, pair: &PairContext, _now: Time) -> CheckOutcome {
        let indicator = self.indicator;
        let count = |user: UserId| async move {
            let records = activity(store, &ActivityFilter::for_user(user)).await;
            records
                .iter()
                .filter(|r| indicator.satisfied_by(r))
                .map(|r| r.date)
                .collect::<HashSet<_>>()
                .len() as u32
        };
        counted(self.min_days, "days", pair, count).await
    }
}

#[async_trait]
impl CompletionCheck for RepairLogged {
    async fn check(&self, store: &dyn RecordStore, pair: &PairContext, _now: Time) -> CheckOutcome {
        let Some(couple_id) = pair.couple_id.as_ref() else {
            return counted(self.min_actions, "repairs", pair, |_user| async { 0 }).await;
        };
        let count = |user: UserId| async move { repair_actions(store, couple_id, &user).await };
        counted(self.min_actions, "repairs", pair, count).await
    }
}

/// Count for the user and (if any) the partner concurrently, then compare
/// both counts with `target`.
async fn counted<F, Fut>(target: u32, unit: &str, pair: &PairContext, count: F) -> CheckOutcome
where
    F: Fn(UserId) -> Fut,
    Fut: std::future::Future<Output = u32>,
{
    let user_fut = count(pair.user_id.clone());
    let partner_fut = async {
        match &pair.partner_id {
            Some(partner) => Some(count(partner.clone()).await),
            None => None,
        }
    };
    let (user_count, partner_count) = futures::join!(user_fut, partner_fut);

    CheckOutcome {
        user_done: user_count >= target,
        partner_done: partner_count.is_some_and(|c| c >= target),
        user_progress: Some(Progress::new(user_count, target, unit)),
        partner_progress: partner_count.map(|c| Progress::new(c, target, unit)),
    }
}

async fn activity(store: &dyn RecordStore, filter: &ActivityFilter) -> Vec<DailyActivityRecord> {
    match store.list_activity(filter).await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "activity query failed; counting as empty");
            Vec::new()
        }
    }
}

async fn repair_actions(store: &dyn RecordStore, couple_id: &CoupleId, user: &UserId) -> u32 {
    match store.list_repair_signals(couple_id, DateTime::<chrono::Utc>::MIN_UTC).await {
        Ok(signals) => signals
            .iter()
            .filter(|s| &s.user_id == user && s.kind == RepairSignalKind::Action)
            .count() as u32,
        Err(e) => {
            warn!(couple = %couple_id, error = %e, "repair signal query failed; counting as zero");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use tandem_core::{RepairSignal, TurnTowardOutcome};
    use tandem_storage::MemoryStore;

    fn now() -> Time {
        Utc.with_ymd_and_hms(2024, 4, 20, 12, 0, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn pair() -> PairContext {
        PairContext {
            user_id: UserId::from("alice"),
            couple_id: Some(CoupleId::from("c1")),
            partner_id: Some(UserId::from("bob")),
        }
    }

    #[tokio::test]
    async fn test_indicator_days_counts_distinct_days() {
        let store = MemoryStore::new();
        // day 11 twice: a duplicate day does not count twice
        let logged = [
            ("alice", 10),
            ("alice", 11),
            ("alice", 11),
            ("bob", 10),
            ("bob", 11),
            ("bob", 12),
        ];
        for (user, d) in logged {
            let record =
                DailyActivityRecord::new(UserId::from(user), date(d)).with_appreciation(true);
            store.save_activity(&record).await.unwrap();
        }

        let check = IndicatorDays { indicator: Indicator::Appreciation, min_days: 3 };
        let outcome = check.check(&store, &pair(), now()).await;

        assert!(!outcome.user_done);
        assert!(outcome.partner_done);
        assert_eq!(outcome.user_progress.unwrap().to_string(), "2/3 days");
        assert_eq!(outcome.partner_progress.unwrap().to_string(), "3/3 days");
    }

    #[tokio::test]
    async fn test_turn_toward_indicator() {
        let store = MemoryStore::new();
        let record = DailyActivityRecord::new(UserId::from("alice"), date(5))
            .with_turn_toward(TurnTowardOutcome::Missed);
        store.save_activity(&record).await.unwrap();

        let check = IndicatorDays { indicator: Indicator::TurnToward, min_days: 1 };
        let outcome = check.check(&store, &PairContext::solo(UserId::from("alice")), now()).await;
        assert!(!outcome.user_done);
        assert!(outcome.partner_progress.is_none());
    }

    #[tokio::test]
    async fn test_activity_logged_window() {
        let store = MemoryStore::new();
        store
            .save_activity(&DailyActivityRecord::new(UserId::from("alice"), date(1)))
            .await
            .unwrap();

        let any_time = ActivityLogged { min_records: 1, within_days: None };
        assert!(any_time.check(&store, &pair(), now()).await.user_done);

        let this_week = ActivityLogged { min_records: 1, within_days: Some(7) };
        assert!(!this_week.check(&store, &pair(), now()).await.user_done);
    }

    #[tokio::test]
    async fn test_repair_logged_counts_actions_only() {
        let store = MemoryStore::new();
        let couple = CoupleId::from("c1");
        let alice = UserId::from("alice");
        let request = RepairSignal::at(couple.clone(), alice, RepairSignalKind::Request, now());
        let action = RepairSignal::at(
            couple.clone(),
            UserId::from("bob"),
            RepairSignalKind::Action,
            now() - Duration::days(30),
        );
        store.save_repair_signal(&request).await.unwrap();
        store.save_repair_signal(&action).await.unwrap();

        let outcome = RepairLogged { min_actions: 1 }.check(&store, &pair(), now()).await;
        assert!(!outcome.user_done);
        assert!(outcome.partner_done);
    }

    #[tokio::test]
    async fn test_repair_logged_without_couple() {
        let store = MemoryStore::new();
        let outcome = RepairLogged { min_actions: 1 }
            .check(&store, &PairContext::solo(UserId::from("alice")), now())
            .await;
        assert!(!outcome.user_done);
        assert_eq!(outcome.user_progress.unwrap().done, 0);
    }
}
