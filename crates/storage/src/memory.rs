//! In-memory record store.
//!
//! Used by tests and by callers that already hold the data they want to
//! evaluate. Nothing survives the process.

use std::collections::{BTreeMap, HashMap};
use async_trait::async_trait;
use tandem_core::{
    ActivityFilter, Couple, CoupleId, DailyActivityRecord, MilestoneCompletion, RecordId,
    RepairSignal, Time, UserId,
};
use tokio::sync::RwLock;
use super::{RecordStore, Result};

#[derive(Default)]
struct Inner {
    activity: HashMap<RecordId, DailyActivityRecord>,
    completions: BTreeMap<(UserId, u32), MilestoneCompletion>,
    signals: Vec<RepairSignal>,
    couples: HashMap<CoupleId, Couple>,
}

/// In-memory backend guarded by a single async lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save_activity(&self, record: &DailyActivityRecord) -> Result<()> {
        self.inner.write().await.activity.insert(record.id, record.clone());
        Ok(())
    }

    async fn list_activity(&self, filter: &ActivityFilter) -> Result<Vec<DailyActivityRecord>> {
        let inner = self.inner.read().await;
        Ok(filter.apply(inner.activity.values().cloned()))
    }

    async fn list_completions(&self, user_id: &UserId) -> Result<Vec<MilestoneCompletion>> {
        let inner = self.inner.read().await;
        // BTreeMap keys sort by (user, number)
        Ok(inner
            .completions
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn upsert_completion(&self, completion: &MilestoneCompletion) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let key = (completion.user_id.clone(), completion.milestone_number);
        if inner.completions.contains_key(&key) {
            return Ok(false);
        }
        inner.completions.insert(key, completion.clone());
        Ok(true)
    }

    async fn save_repair_signal(&self, signal: &RepairSignal) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.signals.retain(|s| s.id != signal.id);
        inner.signals.push(signal.clone());
        Ok(())
    }

    async fn list_repair_signals(
        &self,
        couple_id: &CoupleId,
        since: Time,
    ) -> Result<Vec<RepairSignal>> {
        let inner = self.inner.read().await;
        let mut signals: Vec<_> = inner
            .signals
            .iter()
            .filter(|s| &s.couple_id == couple_id && s.created_at >= since)
            .cloned()
            .collect();
        signals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(signals)
    }

    async fn save_couple(&self, couple: &Couple) -> Result<()> {
        self.inner.write().await.couples.insert(couple.id.clone(), couple.clone());
        Ok(())
    }

    async fn load_couple(&self, id: &CoupleId) -> Result<Option<Couple>> {
        Ok(self.inner.read().await.couples.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use std::sync::Arc;
    use tandem_core::RepairSignalKind;

    #[tokio::test]
    async fn test_upsert_keeps_first_completion() {
        let store = MemoryStore::new();
        let user = UserId::from("alice");
        let first = MilestoneCompletion::at(user.clone(), 1, Utc::now() - Duration::days(2));
        let second = MilestoneCompletion::at(user.clone(), 1, Utc::now());

        assert!(store.upsert_completion(&first).await.unwrap());
        assert!(!store.upsert_completion(&second).await.unwrap());

        let all = store.list_completions(&user).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].completed_at, first.completed_at);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_collapse() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("alice");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let user = user.clone();
                tokio::spawn(async move {
                    store
                        .upsert_completion(&MilestoneCompletion::new(user, 2))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.list_completions(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_completions_sorted_by_number() {
        let store = MemoryStore::new();
        let user = UserId::from("alice");
        for n in [3, 1, 2] {
            store.upsert_completion(&MilestoneCompletion::new(user.clone(), n)).await.unwrap();
        }
        store
            .upsert_completion(&MilestoneCompletion::new(UserId::from("bob"), 1))
            .await
            .unwrap();

        let numbers: Vec<_> = store
            .list_completions(&user)
            .await
            .unwrap()
            .iter()
            .map(|c| c.milestone_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_activity_filtering() {
        let store = MemoryStore::new();
        let user = UserId::from("alice");
        for d in 1..=5 {
            let date = NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
            store.save_activity(&DailyActivityRecord::new(user.clone(), date)).await.unwrap();
        }

        let filter = ActivityFilter::for_user(user)
            .since(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap())
            .newest_first();
        let records = store.list_activity(&filter).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 5, 5).unwrap());
    }

    #[tokio::test]
    async fn test_repair_signals_since() {
        let store = MemoryStore::new();
        let couple = CoupleId::from("c1");
        let now = Utc::now();
        let request = |hours_ago| {
            RepairSignal::at(
                couple.clone(),
                UserId::from("bob"),
                RepairSignalKind::Request,
                now - Duration::hours(hours_ago),
            )
        };
        let old = request(72);
        let fresh = request(2);
        store.save_repair_signal(&fresh).await.unwrap();
        store.save_repair_signal(&old).await.unwrap();

        let signals = store.list_repair_signals(&couple, now - Duration::hours(48)).await.unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].id, fresh.id);
    }
}
