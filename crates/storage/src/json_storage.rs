//! JSON file storage implementation.
//!
//! Stores each row as a JSON file under a root directory (`.tandem` by
//! default). External ids are hex-encoded into file names so distinct ids
//! never share a file.

use std::path::Path;
use async_trait::async_trait;
use tandem_core::{
    ActivityFilter, Couple, CoupleId, DailyActivityRecord, MilestoneCompletion, RecordId,
    RepairSignal, SignalId, Time, UserId,
};
use super::{RecordStore, Result};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// File-based JSON storage backend.
pub struct JsonStore {
    root: std::path::PathBuf,
    write_guard: Mutex<()>,
}

impl JsonStore {
    /// Create storage, creating the collection directories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("activity")).await?;
        fs::create_dir_all(root.join("completions")).await?;
        fs::create_dir_all(root.join("repair_signals")).await?;
        fs::create_dir_all(root.join("couples")).await?;

        Ok(Self {
            root,
            write_guard: Mutex::new(()),
        })
    }

    fn activity_path(&self, id: RecordId) -> std::path::PathBuf {
        self.root.join("activity").join(format!("{}.json", id))
    }
    fn completion_path(&self, user: &UserId, number: u32) -> std::path::PathBuf {
        self.root
            .join("completions")
            .join(format!("{}__{}.json", file_key(user.as_str()), number))
    }
    fn signal_path(&self, id: SignalId) -> std::path::PathBuf {
        self.root.join("repair_signals").join(format!("{}.json", id))
    }
    fn couple_path(&self, id: &CoupleId) -> std::path::PathBuf {
        self.root.join("couples").join(format!("{}.json", file_key(id.as_str())))
    }
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn save_activity(&self, record: &DailyActivityRecord) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.activity_path(record.id), json.as_bytes()).await?;
        debug!(record = %record.id, "saved activity record");
        Ok(())
    }

    async fn list_activity(&self, filter: &ActivityFilter) -> Result<Vec<DailyActivityRecord>> {
        let all: Vec<DailyActivityRecord> = list_dir(&self.root.join("activity")).await?;
        Ok(filter.apply(all))
    }

    async fn list_completions(&self, user_id: &UserId) -> Result<Vec<MilestoneCompletion>> {
        let all: Vec<MilestoneCompletion> = list_dir(&self.root.join("completions")).await?;
        let mut mine: Vec<_> = all.into_iter().filter(|c| &c.user_id == user_id).collect();
        mine.sort_by_key(|c| c.milestone_number);
        Ok(mine)
    }

    async fn upsert_completion(&self, completion: &MilestoneCompletion) -> Result<bool> {
        let _guard = self.write_guard.lock().await;
        let path = self.completion_path(&completion.user_id, completion.milestone_number);
        let json = serde_json::to_string_pretty(completion)?;

        // Only a fully written row is ever linked under the key.
        let tmp = path.with_extension(format!("{}.tmp", completion.id));
        let inserted = link_new(&tmp, &path, json.as_bytes()).await;
        if let Err(e) = fs::remove_file(&tmp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %e, "failed to remove temporary file");
            }
        }
        Ok(inserted?)
    }

    async fn save_repair_signal(&self, signal: &RepairSignal) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let json = serde_json::to_string_pretty(signal)?;
        fs::write(self.signal_path(signal.id), json.as_bytes()).await?;
        Ok(())
    }

    async fn list_repair_signals(
        &self,
        couple_id: &CoupleId,
        since: Time,
    ) -> Result<Vec<RepairSignal>> {
        let all: Vec<RepairSignal> = list_dir(&self.root.join("repair_signals")).await?;
        let mut signals: Vec<_> = all
            .into_iter()
            .filter(|s| &s.couple_id == couple_id && s.created_at >= since)
            .collect();
        signals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(signals)
    }

    async fn save_couple(&self, couple: &Couple) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let json = serde_json::to_string_pretty(couple)?;
        fs::write(self.couple_path(&couple.id), json.as_bytes()).await?;
        Ok(())
    }

    async fn load_couple(&self, id: &CoupleId) -> Result<Option<Couple>> {
        read_json(&self.couple_path(id)).await
    }
}

/// Hex-encode an external identifier into a file-name component.
///
/// Distinct ids always map to distinct names, including on case-insensitive
/// file systems.
fn file_key(raw: &str) -> String {
    raw.bytes().map(|b| format!("{:02x}", b)).collect()
}

/// Write `bytes` to `tmp`, then link it to `path` unless `path` exists.
///
/// Returns `false` when `path` already exists.
async fn link_new(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<bool> {
    fs::write(tmp, bytes).await?;
    match fs::hard_link(tmp, path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &std::path::Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use tandem_core::{RepairSignalKind, TurnTowardOutcome};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_activity_roundtrip_and_filter() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let user = UserId::from("alice");

        let date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        let record = DailyActivityRecord::new(user.clone(), date)
            .with_appreciation(true)
            .with_turn_toward(TurnTowardOutcome::Initiated)
            .with_climate(4);
        store.save_activity(&record).await.unwrap();
        store
            .save_activity(&DailyActivityRecord::new(UserId::from("bob"), record.date))
            .await
            .unwrap();

        let loaded = store.list_activity(&ActivityFilter::for_user(user)).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].deposit_count(), 2);
        assert_eq!(loaded[0].climate, Some(4));
    }

    #[tokio::test]
    async fn test_completion_upsert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let user = UserId::from("user@example.com");

        let first = MilestoneCompletion::at(user.clone(), 1, Utc::now() - Duration::days(1));
        assert!(store.upsert_completion(&first).await.unwrap());
        assert!(!store
            .upsert_completion(&MilestoneCompletion::new(user.clone(), 1))
            .await
            .unwrap());

        let all = store.list_completions(&user).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].completed_at, first.completed_at);
    }

    #[tokio::test]
    async fn test_couple_and_signals() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let couple = Couple::new(
            CoupleId::from("c/1"),
            vec![UserId::from("alice"), UserId::from("bob")],
        );
        store.save_couple(&couple).await.unwrap();
        assert_eq!(store.load_couple(&couple.id).await.unwrap(), Some(couple.clone()));
        assert_eq!(store.load_couple(&CoupleId::from("missing")).await.unwrap(), None);

        let signal =
            RepairSignal::new(couple.id.clone(), UserId::from("bob"), RepairSignalKind::Request);
        store.save_repair_signal(&signal).await.unwrap();
        let signals = store
            .list_repair_signals(&couple.id, Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, RepairSignalKind::Request);
    }

    #[tokio::test]
    async fn test_similar_ids_do_not_share_rows() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let first = UserId::from("a.b@c.com");
        let second = UserId::from("a@b.c.com");

        let completion = MilestoneCompletion::new(first.clone(), 1);
        assert!(store.upsert_completion(&completion).await.unwrap());
        let completion = MilestoneCompletion::new(second.clone(), 1);
        assert!(store.upsert_completion(&completion).await.unwrap());
        assert_eq!(store.list_completions(&first).await.unwrap().len(), 1);
        assert_eq!(store.list_completions(&second).await.unwrap().len(), 1);

        let dotted = Couple::new(CoupleId::from("x.y"), vec![first.clone()]);
        let at = Couple::new(CoupleId::from("x@y"), vec![second.clone()]);
        store.save_couple(&dotted).await.unwrap();
        store.save_couple(&at).await.unwrap();
        assert_eq!(store.load_couple(&dotted.id).await.unwrap(), Some(dotted));
        assert_eq!(store.load_couple(&at.id).await.unwrap(), Some(at));
    }

    #[test]
    fn test_case_only_difference_keeps_separate_files() {
        assert_ne!(file_key("Alice"), file_key("alice"));
        assert_eq!(file_key("a/b"), "612f62");
    }

    #[tokio::test]
    async fn test_failed_completion_write_does_not_claim_key() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let user = UserId::from("alice");

        fs::remove_dir_all(dir.path().join("completions")).await.unwrap();
        assert!(store.upsert_completion(&MilestoneCompletion::new(user.clone(), 1)).await.is_err());

        fs::create_dir_all(dir.path().join("completions")).await.unwrap();
        assert!(store.upsert_completion(&MilestoneCompletion::new(user.clone(), 1)).await.unwrap());
        assert_eq!(store.list_completions(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_completion_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        let user = UserId::from("alice");
        store.upsert_completion(&MilestoneCompletion::new(user.clone(), 1)).await.unwrap();
        store.upsert_completion(&MilestoneCompletion::new(user, 1)).await.unwrap();

        let mut names = Vec::new();
        let mut rd = fs::read_dir(dir.path().join("completions")).await.unwrap();
        while let Some(entry) = rd.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![format!("{}__1.json", file_key("alice"))]);
    }
}
