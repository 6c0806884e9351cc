//! LocalStore port - 端末ローカルの永続化（写真 + 未送信キュー）
//!
//! # 実装
//! - InMemoryLocalStore（テスト・デモ用）
//! - SqliteLocalStore（本番用、ファイルに永続化）

use async_trait::async_trait;

use crate::domain::{
    DeadLetter, OperationId, PackageId, PendingOperation, PhotoId, StoredPhoto, SyncOperation,
};
use crate::error::StoreError;
use crate::observability::QueueHealth;

/// Durable, device-local persistence of photos and deferred remote writes.
///
/// Every method is atomic on its own record. Nothing spans "list pending"
/// and "remove applied", so a drain replays at least once.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Store a photo under a fresh id that was never issued before by this store.
    async fn save_photo(
        &self,
        content: Vec<u8>,
        owner: Option<PackageId>,
    ) -> Result<PhotoId, StoreError>;

    /// `Ok(None)` for unknown or deleted ids.
    async fn get_photo(&self, id: &PhotoId) -> Result<Option<StoredPhoto>, StoreError>;

    /// Idempotent.
    async fn delete_photo(&self, id: &PhotoId) -> Result<(), StoreError>;

    /// Append to the queue. No remote contact.
    async fn enqueue_operation(&self, operation: SyncOperation) -> Result<OperationId, StoreError>;

    /// Snapshot of the queue, oldest first.
    async fn list_pending_operations(&self) -> Result<Vec<PendingOperation>, StoreError>;

    /// Idempotent.
    async fn remove_operation(&self, id: OperationId) -> Result<(), StoreError>;

    /// Bump the attempt counter. `None` if the operation is no longer queued.
    async fn record_failed_attempt(
        &self,
        id: OperationId,
        error: &str,
    ) -> Result<Option<u32>, StoreError>;

    /// Move a queued operation to the dead-letter set. `false` if it was not queued.
    async fn quarantine_operation(&self, id: OperationId, reason: &str) -> Result<bool, StoreError>;

    async fn list_dead_letters(&self) -> Result<Vec<DeadLetter>, StoreError>;

    /// Put a dead letter back at the tail of the queue with a fresh id, a
    /// reset attempt counter and `enqueued_at` set to now.
    async fn requeue_dead_letter(&self, id: OperationId) -> Result<Option<OperationId>, StoreError>;

    async fn queue_health(&self) -> Result<QueueHealth, StoreError>;
}
