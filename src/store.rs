// src/store.rs
// SqlFaultStore — the rollup store over the connection pool

use crate::db::{faults, DatabasePool};
use crate::error::Result;
use crate::fault::Fault;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Trailing duration within which two same-fingerprint reports are treated
/// as the same ongoing incident.
pub const DEFAULT_ROLLUP_WINDOW: Duration = Duration::from_secs(30 * 60);

/// What happened to a recorded fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Merged into an existing record; carries the pre-existing record's guid.
    Merged(Uuid),
    /// Inserted as a new durable record.
    Inserted(Uuid),
}

impl RecordOutcome {
    /// The guid of the durable record this report ended up in.
    pub fn guid(&self) -> Uuid {
        match self {
            RecordOutcome::Merged(guid) | RecordOutcome::Inserted(guid) => *guid,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, RecordOutcome::Merged(_))
    }
}

/// Durable fault storage backed by SQLite.
///
/// Safe to share (`Arc`) and call concurrently: the match-or-insert is a
/// single IMMEDIATE transaction, so concurrent reports of the same error
/// cannot race into duplicate rows or lost increments. No external locking
/// needed.
pub struct SqlFaultStore {
    pool: DatabasePool,
    rollup_window: chrono::Duration,
}

impl SqlFaultStore {
    /// Open (creating if needed) a store at the given database path.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = DatabasePool::open(path).await?;
        Ok(Self::with_pool(pool))
    }

    /// Open an in-memory store (tests, throwaway tooling).
    pub async fn open_in_memory() -> Result<Self> {
        let pool = DatabasePool::open_in_memory().await?;
        Ok(Self::with_pool(pool))
    }

    fn with_pool(pool: DatabasePool) -> Self {
        Self {
            pool,
            rollup_window: chrono::Duration::from_std(DEFAULT_ROLLUP_WINDOW)
                .unwrap_or_else(|_| chrono::Duration::minutes(30)),
        }
    }

    /// Override the rollup window (default 30 minutes).
    pub fn with_rollup_window(mut self, window: Duration) -> Self {
        if let Ok(w) = chrono::Duration::from_std(window) {
            self.rollup_window = w;
        }
        self
    }

    /// Access the underlying pool, e.g. for maintenance tooling.
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Record a fault: atomically merge it into a matching recent record or
    /// insert it as a new one.
    ///
    /// On merge the fault's guid is replaced with the existing record's and
    /// `is_duplicate` is set; on insert its `full_json` snapshot is
    /// populated. Contention and unreachable-store failures surface as
    /// `StoreUnavailable`; nothing is silently dropped.
    pub async fn record(&self, fault: &mut Fault) -> Result<RecordOutcome> {
        // Snapshot before the store mutates anything; only persisted on insert.
        let snapshot = serde_json::to_string(&*fault)?;

        let to_store = fault.clone();
        let snapshot_for_insert = snapshot.clone();
        let window = self.rollup_window;
        let recorded = self
            .pool
            .run_with_retry(move |conn| {
                faults::record_fault_sync(conn, &to_store, &snapshot_for_insert, window)
            })
            .await?;

        if recorded.merged {
            debug!(guid = %recorded.guid, app = %fault.application_name, "fault merged into existing record");
            fault.guid = recorded.guid;
            fault.is_duplicate = true;
            Ok(RecordOutcome::Merged(recorded.guid))
        } else {
            debug!(guid = %recorded.guid, app = %fault.application_name, "fault inserted as new record");
            fault.full_json = Some(snapshot);
            Ok(RecordOutcome::Inserted(recorded.guid))
        }
    }

    /// Fetch a stored fault by guid (including soft-deleted records).
    pub async fn get(&self, guid: Uuid) -> Result<Option<Fault>> {
        self.pool
            .run(move |conn| faults::get_fault_sync(conn, &guid))
            .await
    }

    /// Most recent non-deleted faults, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Fault>> {
        self.pool
            .run(move |conn| faults::recent_faults_sync(conn, limit))
            .await
    }

    /// Protect a record from deletion. Returns false if the guid is unknown.
    pub async fn protect(&self, guid: Uuid) -> Result<bool> {
        self.pool
            .run(move |conn| faults::protect_fault_sync(conn, &guid))
            .await
    }

    /// Soft-delete a record. Protected records are refused (returns false).
    pub async fn delete(&self, guid: Uuid) -> Result<bool> {
        self.pool
            .run(move |conn| faults::delete_fault_sync(conn, &guid))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultParams;

    fn test_fault(detail: &str) -> Fault {
        Fault::from_parts(FaultParams {
            application_name: "svc1",
            machine_name: "web01",
            error_type: "TestError",
            source: "tests",
            message: "it broke",
            detail,
            rollup_per_server: false,
            context: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_record_insert_then_merge() {
        let store = SqlFaultStore::open_in_memory().await.unwrap();

        let mut first = test_fault("boom");
        let outcome = store.record(&mut first).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Inserted(first.guid));
        assert!(!first.is_duplicate);
        assert!(first.full_json.is_some(), "snapshot populated on insert");

        let mut second = test_fault("boom");
        let original_guid = first.guid;
        let outcome = store.record(&mut second).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Merged(original_guid));
        assert_eq!(second.guid, original_guid, "guid replaced by the matched record's");
        assert!(second.is_duplicate);
        assert!(second.full_json.is_none(), "no snapshot on merge");

        let stored = store.get(original_guid).await.unwrap().unwrap();
        assert_eq!(stored.duplicate_count, 2);
    }

    #[tokio::test]
    async fn test_record_empty_detail_never_merges() {
        let store = SqlFaultStore::open_in_memory().await.unwrap();

        let mut a = test_fault("");
        let mut b = test_fault("");
        assert!(store.record(&mut a).await.unwrap().guid() == a.guid);
        let outcome = store.record(&mut b).await.unwrap();
        assert!(!outcome.is_merged());
        assert_eq!(store.recent(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_protect_and_delete() {
        let store = SqlFaultStore::open_in_memory().await.unwrap();

        let mut fault = test_fault("boom");
        store.record(&mut fault).await.unwrap();

        assert!(store.protect(fault.guid).await.unwrap());
        assert!(!store.delete(fault.guid).await.unwrap());

        let mut other = test_fault("other boom");
        store.record(&mut other).await.unwrap();
        assert!(store.delete(other.guid).await.unwrap());
        assert_eq!(store.recent(10).await.unwrap().len(), 1);
        // still inspectable by guid after soft delete
        assert!(store.get(other.guid).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_custom_window() {
        let store = SqlFaultStore::open_in_memory()
            .await
            .unwrap()
            .with_rollup_window(Duration::from_secs(60));

        let mut first = test_fault("boom");
        store.record(&mut first).await.unwrap();

        // Backdate past the 60s window
        let guid = first.guid;
        store
            .pool()
            .run(move |conn| {
                conn.execute(
                    "UPDATE faults SET created_at = datetime('now', '-120 seconds') WHERE guid = ?1",
                    rusqlite::params![guid.to_string()],
                )
            })
            .await
            .unwrap();

        let mut second = test_fault("boom");
        let outcome = store.record(&mut second).await.unwrap();
        assert!(!outcome.is_merged(), "report outside the shortened window inserts");
    }
}
