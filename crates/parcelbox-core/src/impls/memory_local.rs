//! In-memory local store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{
    DeadLetter, OperationId, PackageId, PendingOperation, PhotoId, StoredPhoto, SyncOperation,
};
use crate::error::StoreError;
use crate::observability::QueueHealth;
use crate::ports::{Clock, IdGenerator, LocalStore, SystemClock, UlidGenerator};

/// In-memory store state.
#[derive(Default)]
struct InMemoryLocalState {
    photos: HashMap<PhotoId, StoredPhoto>,

    /// Every photo id ever issued (deleted ones included).
    issued_photo_ids: HashSet<PhotoId>,

    /// Pending queue, ordered by id (= enqueue order).
    pending: BTreeMap<OperationId, PendingOperation>,

    dead_letters: BTreeMap<OperationId, DeadLetter>,

    /// Next operation id to assign. Never reused.
    next_operation_id: i64,
}

impl InMemoryLocalState {
    fn allocate_operation_id(&mut self) -> OperationId {
        self.next_operation_id += 1;
        OperationId::new(self.next_operation_id)
    }

    fn push_pending(&mut self, mut operation: PendingOperation) -> OperationId {
        let id = self.allocate_operation_id();
        operation.id = id;
        self.pending.insert(id, operation);
        id
    }
}

/// Local store kept in process memory. Lost on restart; meant for tests
/// and demos.
pub struct InMemoryLocalStore {
    state: Arc<Mutex<InMemoryLocalState>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(clock, Arc::new(UlidGenerator::new(SystemClock)))
    }

    pub fn with_parts(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryLocalState::default())),
            clock,
            ids,
        }
    }

    /// Queue a raw kind/payload pair, as an older build might have persisted it.
    #[cfg(test)]
    pub(crate) async fn enqueue_raw(&self, kind: &str, payload: serde_json::Value) -> OperationId {
        let mut state = self.state.lock().await;
        let operation = PendingOperation::new(
            OperationId::new(0),
            crate::domain::QueuedOperation::from_parts(kind, payload),
            self.clock.now(),
        );
        state.push_pending(operation)
    }
}

impl Default for InMemoryLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn save_photo(
        &self,
        content: Vec<u8>,
        owner: Option<PackageId>,
    ) -> Result<PhotoId, StoreError> {
        let mut state = self.state.lock().await;
        let id = loop {
            let candidate = self.ids.generate_photo_id();
            if state.issued_photo_ids.insert(candidate) {
                break candidate;
            }
        };
        let photo = StoredPhoto {
            id,
            package_id: owner,
            captured_at: self.clock.now(),
            content,
        };
        debug!(photo_id = %id, bytes = photo.len(), "photo saved");
        state.photos.insert(id, photo);
        Ok(id)
    }

    async fn get_photo(&self, id: &PhotoId) -> Result<Option<StoredPhoto>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.photos.get(id).cloned())
    }

    async fn delete_photo(&self, id: &PhotoId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.photos.remove(id);
        Ok(())
    }

    async fn enqueue_operation(&self, operation: SyncOperation) -> Result<OperationId, StoreError> {
        let mut state = self.state.lock().await;
        let kind = operation.kind();
        let pending = PendingOperation::new(OperationId::new(0), operation.into(), self.clock.now());
        let id = state.push_pending(pending);
        debug!(operation_id = %id, kind, "operation enqueued");
        Ok(id)
    }

    async fn list_pending_operations(&self) -> Result<Vec<PendingOperation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.pending.values().cloned().collect())
    }

    async fn remove_operation(&self, id: OperationId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.pending.remove(&id);
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: OperationId,
        error: &str,
    ) -> Result<Option<u32>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.pending.get_mut(&id).map(|op| {
            op.record_failure(error);
            op.attempts
        }))
    }

    async fn quarantine_operation(&self, id: OperationId, reason: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(operation) = state.pending.remove(&id) else {
            return Ok(false);
        };
        let letter = DeadLetter {
            operation,
            quarantined_at: self.clock.now(),
            reason: reason.to_string(),
        };
        state.dead_letters.insert(id, letter);
        Ok(true)
    }

    async fn list_dead_letters(&self) -> Result<Vec<DeadLetter>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.dead_letters.values().cloned().collect())
    }

    async fn requeue_dead_letter(&self, id: OperationId) -> Result<Option<OperationId>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(letter) = state.dead_letters.remove(&id) else {
            return Ok(None);
        };
        let DeadLetter { operation, .. } = letter;
        let fresh = PendingOperation::new(id, operation.operation, self.clock.now());
        Ok(Some(state.push_pending(fresh)))
    }

    async fn queue_health(&self) -> Result<QueueHealth, StoreError> {
        let state = self.state.lock().await;
        let mut health = QueueHealth {
            dead_lettered: state.dead_letters.len(),
            ..QueueHealth::default()
        };
        for op in state.pending.values() {
            health.pending += 1;
            if !op.operation.is_decoded() {
                health.undecodable += 1;
            }
            if op.attempts > 0 {
                health.retrying += 1;
            }
        }
        Ok(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PackageStatus, PackageUpdate, PickupUpdate};
    use crate::testing::{ScriptedIds, StepClock};
    use chrono::TimeZone;

    fn pickup(package: &str) -> SyncOperation {
        SyncOperation::ApplyPickupUpdate(PickupUpdate {
            package_id: PackageId::new(package),
            updates: PackageUpdate::status(PackageStatus::Retired),
        })
    }

    #[tokio::test]
    async fn photo_ids_are_unique() {
        let store = InMemoryLocalStore::new();
        let mut seen = HashSet::new();
        for i in 0..50u8 {
            let id = store.save_photo(vec![i], None).await.unwrap();
            assert!(seen.insert(id));
        }
    }

    #[tokio::test]
    async fn deleted_photo_id_is_never_reissued() {
        let first = PhotoId::from(ulid::Ulid::new());
        let second = PhotoId::from(ulid::Ulid::new());
        let ids = ScriptedIds::new([first, first, second]);
        let store = InMemoryLocalStore::with_parts(Arc::new(SystemClock), Arc::new(ids));

        assert_eq!(store.save_photo(vec![1], None).await.unwrap(), first);
        store.delete_photo(&first).await.unwrap();

        // the generator offers `first` again; the store skips it
        assert_eq!(store.save_photo(vec![2], None).await.unwrap(), second);
        assert!(store.get_photo(&first).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_photo_is_none() {
        let store = InMemoryLocalStore::new();
        let id = store.save_photo(vec![1, 2, 3], None).await.unwrap();
        store.delete_photo(&id).await.unwrap();

        assert!(store.get_photo(&id).await.unwrap().is_none());
        // 二回目の削除もエラーにならない
        store.delete_photo(&id).await.unwrap();
    }

    #[tokio::test]
    async fn photo_keeps_owner_and_content() {
        let store = InMemoryLocalStore::new();
        let id = store
            .save_photo(vec![9, 9], Some(PackageId::new("p1")))
            .await
            .unwrap();
        let photo = store.get_photo(&id).await.unwrap().unwrap();
        assert_eq!(photo.content, vec![9, 9]);
        assert_eq!(photo.package_id, Some(PackageId::new("p1")));
    }

    #[tokio::test]
    async fn queue_is_fifo() {
        let store = InMemoryLocalStore::new();
        let a = store.enqueue_operation(pickup("a")).await.unwrap();
        let b = store.enqueue_operation(pickup("b")).await.unwrap();
        let c = store.enqueue_operation(pickup("c")).await.unwrap();

        let ids: Vec<_> = store
            .list_pending_operations()
            .await
            .unwrap()
            .into_iter()
            .map(|op| op.id)
            .collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_ids_are_not_reused() {
        let store = InMemoryLocalStore::new();
        let a = store.enqueue_operation(pickup("a")).await.unwrap();
        store.remove_operation(a).await.unwrap();
        store.remove_operation(a).await.unwrap();
        assert!(store.list_pending_operations().await.unwrap().is_empty());

        let b = store.enqueue_operation(pickup("b")).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn quarantine_and_requeue() {
        let store = InMemoryLocalStore::new();
        let a = store.enqueue_operation(pickup("a")).await.unwrap();
        assert_eq!(store.record_failed_attempt(a, "boom").await.unwrap(), Some(1));
        assert!(store.quarantine_operation(a, "boom").await.unwrap());
        assert!(!store.quarantine_operation(a, "boom").await.unwrap());

        let health = store.queue_health().await.unwrap();
        assert_eq!(health.pending, 0);
        assert_eq!(health.dead_lettered, 1);

        let letters = store.list_dead_letters().await.unwrap();
        assert_eq!(letters[0].operation.attempts, 1);
        assert_eq!(letters[0].reason, "boom");

        let requeued = store.requeue_dead_letter(a).await.unwrap().unwrap();
        assert!(requeued > a);
        let pending = store.list_pending_operations().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 0);
        assert!(store.requeue_dead_letter(a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn requeued_letter_is_stamped_at_requeue_time() {
        let start = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let store = InMemoryLocalStore::with_clock(Arc::new(StepClock::new(start)));
        let a = store.enqueue_operation(pickup("a")).await.unwrap();
        store.quarantine_operation(a, "boom").await.unwrap();
        store.enqueue_operation(pickup("b")).await.unwrap();
        store.requeue_dead_letter(a).await.unwrap().unwrap();

        let pending = store.list_pending_operations().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].enqueued_at < pending[1].enqueued_at);
    }

    #[tokio::test]
    async fn failed_attempt_on_missing_operation_is_none() {
        let store = InMemoryLocalStore::new();
        let attempts = store
            .record_failed_attempt(OperationId::new(42), "gone")
            .await
            .unwrap();
        assert!(attempts.is_none());
    }

    #[tokio::test]
    async fn health_counts_undecodable_rows() {
        let store = InMemoryLocalStore::new();
        store.enqueue_raw("archive_package", serde_json::json!({})).await;
        store.enqueue_operation(pickup("a")).await.unwrap();

        let health = store.queue_health().await.unwrap();
        assert_eq!(health.pending, 2);
        assert_eq!(health.undecodable, 1);
        assert!(!health.is_clean());
    }
}
