//! FrontDesk - 受付の業務フロー（登録・仕分け・通知・受け渡し）
//!
//! # 学習ポイント
//! - リモートへの書き込みが通らなければキューに積んで `Deferred` を返す
//! - 書き込みが通ったらついでに溜まっているキューを流す
//! - 状態遷移は `PackageStatus::can_transition_to` で前進のみ

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    CreatePackage, NotificationMessage, OperationId, Package, PackageDraft, PackageId,
    PackageRecord, PackageStatus, PackageUpdate, PickupUpdate, SyncOperation, Unit, UnitId,
};
use crate::error::{RemoteError, WorkflowError};
use crate::ports::{
    BatchWrite, Clock, Collection, DocumentStore, Filter, IdGenerator, LocalStore, to_fields,
};
use crate::sync::SyncEngine;

/// Unit searches shorter than this return nothing.
pub const MIN_UNIT_QUERY_LEN: usize = 2;

/// Outcome of registering a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The package document exists remotely.
    Synced(PackageId),
    /// Queued; the document will be created on a later drain under the
    /// same id.
    Deferred {
        package_id: PackageId,
        operation_id: OperationId,
    },
}

impl Registration {
    pub fn package_id(&self) -> &PackageId {
        match self {
            Registration::Synced(id) => id,
            Registration::Deferred { package_id, .. } => package_id,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Registration::Deferred { .. })
    }
}

/// Outcome of recording a pickup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pickup {
    /// Number of packages retired in one batch.
    Synced(usize),
    /// One queued update per package.
    Deferred(Vec<OperationId>),
}

/// Front-desk workflows over the local and remote stores.
pub struct FrontDesk {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn DocumentStore>,
    engine: Arc<SyncEngine>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl FrontDesk {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn DocumentStore>,
        engine: Arc<SyncEngine>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            local,
            remote,
            engine,
            clock,
            ids,
        }
    }

    /// Log a parcel at the desk.
    ///
    /// With a photo the package is ready for notification right away;
    /// ordinary parcels logged without one wait for triage. Perishable
    /// parcels must be photographed here.
    pub async fn register_package(
        &self,
        draft: PackageDraft,
        photo: Option<Vec<u8>>,
    ) -> Result<Registration, WorkflowError> {
        if draft.tracking_code.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("tracking code is empty".into()));
        }
        if draft.unit_id.as_str().trim().is_empty() {
            return Err(WorkflowError::InvalidInput("unit is not selected".into()));
        }
        if photo.is_none() && draft.kind.requires_intake_photo() {
            return Err(WorkflowError::InvalidInput(
                "perishable parcels need a photo".into(),
            ));
        }

        let key = self.ids.generate_idempotency_key();
        let package_id = PackageId::from(key);
        let photo_id = match photo {
            Some(content) => Some(
                self.local
                    .save_photo(content, Some(package_id.clone()))
                    .await?,
            ),
            None => None,
        };

        let create = CreatePackage {
            idempotency_key: key,
            package: PackageRecord::intake(draft, photo_id, self.clock.now()),
        };
        let registration = self.submit_create(create).await;
        if let (Err(e), Some(photo_id)) = (&registration, photo_id) {
            // neither created nor queued: nothing refers to the photo
            warn!(%package_id, %photo_id, error = %e, "registration failed, dropping photo");
            self.local.delete_photo(&photo_id).await?;
        }
        registration
    }

    async fn submit_create(&self, create: CreatePackage) -> Result<Registration, WorkflowError> {
        let package_id = create.package_id();

        if self.engine.is_online() {
            let data = to_fields(&create.package).map_err(RemoteError::from)?;
            match self
                .remote
                .create_document_with_id(Collection::Packages, package_id.as_str(), data)
                .await
            {
                Ok(()) | Err(RemoteError::AlreadyExists { .. }) => {
                    info!(%package_id, tracking_code = %create.package.tracking_code, "package registered");
                    self.flush_backlog().await;
                    return Ok(Registration::Synced(package_id));
                }
                Err(e) => warn!(%package_id, error = %e, "remote create failed, deferring"),
            }
        }

        let operation_id = self
            .local
            .enqueue_operation(SyncOperation::CreatePackage(create))
            .await?;
        info!(%package_id, %operation_id, "package registration deferred");
        Ok(Registration::Deferred {
            package_id,
            operation_id,
        })
    }

    /// Photograph a package that was waiting for triage and make it ready
    /// for notification.
    pub async fn triage_package(
        &self,
        package_id: &PackageId,
        photo: Vec<u8>,
    ) -> Result<Package, WorkflowError> {
        let package = self.load_package(package_id).await?;
        Self::check_transition(&package, PackageStatus::PendingNotification)?;
        if package.record.local_photo_id.is_some() {
            return Err(WorkflowError::InvalidInput(format!(
                "package {package_id} already has a photo"
            )));
        }

        let photo_id = self
            .local
            .save_photo(photo, Some(package_id.clone()))
            .await?;
        let update = PackageUpdate::triaged(Some(photo_id));
        if let Err(e) = self.write_update(package_id, &update).await {
            // the photo would otherwise be orphaned
            self.local.delete_photo(&photo_id).await?;
            return Err(e);
        }
        info!(%package_id, %photo_id, "package triaged");
        self.flush_backlog().await;

        let mut record = package.record;
        record.status = PackageStatus::PendingNotification;
        record.local_photo_id = Some(photo_id);
        Ok(Package {
            id: package.id,
            record,
        })
    }

    /// Units whose number starts with `prefix`.
    pub async fn search_units(&self, prefix: &str) -> Result<Vec<Unit>, WorkflowError> {
        let prefix = prefix.trim();
        if prefix.chars().count() < MIN_UNIT_QUERY_LEN {
            return Ok(Vec::new());
        }
        let docs = self
            .remote
            .query(Collection::Units, &[Filter::prefix("id", prefix)])
            .await?;
        let mut units = docs
            .iter()
            .map(|doc| doc.decode::<Unit>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(RemoteError::from)?;
        units.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(units)
    }

    /// Packages in `status`, oldest first.
    pub async fn list_by_status(
        &self,
        status: PackageStatus,
    ) -> Result<Vec<Package>, WorkflowError> {
        self.query_packages(&[Filter::equals("status", status.as_str())])
            .await
    }

    /// Packages of one unit waiting to be picked up.
    pub async fn pending_pickups(&self, unit_id: &UnitId) -> Result<Vec<Package>, WorkflowError> {
        self.query_packages(&[
            Filter::equals("status", PackageStatus::PendingPickup.as_str()),
            Filter::equals("unit_id", unit_id.as_str()),
        ])
        .await
    }

    /// Build the resident message for a package, with its local photo.
    pub async fn compose_notification(
        &self,
        package_id: &PackageId,
    ) -> Result<NotificationMessage, WorkflowError> {
        let package = self.load_package(package_id).await?;
        let unit = self.load_unit(&package.record.unit_id).await?;
        let photo_id = package
            .record
            .local_photo_id
            .ok_or_else(|| WorkflowError::NoPhoto(package_id.clone()))?;
        let photo = self
            .local
            .get_photo(&photo_id)
            .await?
            .ok_or(WorkflowError::PhotoMissing(photo_id))?;

        debug!(%package_id, %photo_id, bytes = photo.len(), "notification composed");
        Ok(NotificationMessage::package_arrived(&package, &unit, Some(&photo)))
    }

    /// The resident was told; the package now waits for pickup.
    pub async fn mark_notified(&self, package_id: &PackageId) -> Result<(), WorkflowError> {
        let package = self.load_package(package_id).await?;
        Self::check_transition(&package, PackageStatus::PendingPickup)?;
        self.write_update(package_id, &PackageUpdate::notified(self.clock.now()))
            .await?;
        info!(%package_id, "resident notified");
        self.flush_backlog().await;
        Ok(())
    }

    /// Hand packages over to `recipient`, who signed `signature`.
    ///
    /// Online, all packages are retired in one atomic batch. If that is not
    /// possible one update per package is queued instead.
    pub async fn record_pickup(
        &self,
        package_ids: &[PackageId],
        recipient: &str,
        signature: &str,
    ) -> Result<Pickup, WorkflowError> {
        if package_ids.is_empty() {
            return Err(WorkflowError::InvalidInput("no package selected".into()));
        }
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(WorkflowError::InvalidInput("recipient name is empty".into()));
        }
        if signature.is_empty() {
            return Err(WorkflowError::InvalidInput("signature is required".into()));
        }

        let update = PackageUpdate::retired(self.clock.now(), recipient, signature);

        if self.engine.is_online() {
            match self.retire_batch(package_ids, &update).await {
                Ok(()) => {
                    info!(count = package_ids.len(), recipient, "pickup recorded");
                    self.flush_backlog().await;
                    return Ok(Pickup::Synced(package_ids.len()));
                }
                Err(WorkflowError::Remote(e)) if !matches!(e, RemoteError::Encoding(_)) => {
                    warn!(error = %e, "pickup batch failed, deferring");
                }
                Err(e) => return Err(e),
            }
        }

        let mut queued = Vec::with_capacity(package_ids.len());
        for package_id in package_ids {
            let operation = SyncOperation::ApplyPickupUpdate(PickupUpdate {
                package_id: package_id.clone(),
                updates: update.clone(),
            });
            queued.push(self.local.enqueue_operation(operation).await?);
        }
        info!(count = queued.len(), recipient, "pickup deferred");
        Ok(Pickup::Deferred(queued))
    }

    async fn retire_batch(
        &self,
        package_ids: &[PackageId],
        update: &PackageUpdate,
    ) -> Result<(), WorkflowError> {
        let fields = to_fields(update).map_err(RemoteError::from)?;
        let mut writes = Vec::with_capacity(package_ids.len());
        for package_id in package_ids {
            let package = self.load_package(package_id).await?;
            Self::check_transition(&package, PackageStatus::Retired)?;
            writes.push(BatchWrite::Update {
                collection: Collection::Packages,
                id: package_id.as_str().to_string(),
                fields: fields.clone(),
            });
        }
        self.remote.commit_batch(writes).await?;
        Ok(())
    }

    async fn write_update(
        &self,
        package_id: &PackageId,
        update: &PackageUpdate,
    ) -> Result<(), WorkflowError> {
        let fields = to_fields(update).map_err(RemoteError::from)?;
        self.remote
            .update_fields(Collection::Packages, package_id.as_str(), fields)
            .await?;
        Ok(())
    }

    async fn query_packages(&self, filters: &[Filter]) -> Result<Vec<Package>, WorkflowError> {
        let docs = self.remote.query(Collection::Packages, filters).await?;
        let mut packages = docs
            .iter()
            .map(|doc| doc.decode::<Package>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(RemoteError::from)?;
        packages.sort_by_key(|p| p.record.created_at);
        Ok(packages)
    }

    async fn load_package(&self, package_id: &PackageId) -> Result<Package, WorkflowError> {
        let doc = self
            .remote
            .get_document(Collection::Packages, package_id.as_str())
            .await?
            .ok_or_else(|| WorkflowError::PackageNotFound(package_id.clone()))?;
        Ok(doc.decode::<Package>().map_err(RemoteError::from)?)
    }

    async fn load_unit(&self, unit_id: &UnitId) -> Result<Unit, WorkflowError> {
        let docs = self
            .remote
            .query(Collection::Units, &[Filter::equals("id", unit_id.as_str())])
            .await?;
        let doc = docs
            .first()
            .ok_or_else(|| WorkflowError::UnitNotFound(unit_id.clone()))?;
        Ok(doc.decode::<Unit>().map_err(RemoteError::from)?)
    }

    fn check_transition(package: &Package, to: PackageStatus) -> Result<(), WorkflowError> {
        let from = package.record.status;
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                package_id: package.id.clone(),
                from,
                to,
            })
        }
    }

    /// Opportunistic drain after a successful remote write.
    async fn flush_backlog(&self) {
        match self.engine.sync_pending_items().await {
            Ok(report) if report.applied + report.failed + report.skipped > 0 => {
                info!(%report, "backlog flushed");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "backlog flush failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeadLetter, Location, PackageKind, PendingOperation, PhotoId, StoredPhoto};
    use crate::error::StoreError;
    use crate::impls::{InMemoryDocumentStore, InMemoryLocalStore, WatchConnectivity};
    use crate::observability::QueueHealth;
    use crate::ports::{FixedClock, SystemClock, UlidGenerator};
    use crate::testing::ScriptedIds;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::json;

    struct Desk {
        local: Arc<InMemoryLocalStore>,
        remote: Arc<InMemoryDocumentStore>,
        connectivity: Arc<WatchConnectivity>,
        desk: FrontDesk,
    }

    async fn desk() -> Desk {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        let local = Arc::new(InMemoryLocalStore::with_clock(Arc::new(clock)));
        let remote = Arc::new(InMemoryDocumentStore::new());
        let connectivity = Arc::new(WatchConnectivity::new(true));
        let engine = Arc::new(SyncEngine::new(
            local.clone(),
            remote.clone(),
            connectivity.clone(),
        ));
        let desk = FrontDesk::new(
            local.clone(),
            remote.clone(),
            engine,
            Arc::new(clock),
            Arc::new(UlidGenerator::new(clock)),
        );

        for (id, block, phone) in [("101", "A", "+5511999990101"), ("102", "A", ""), ("201", "B", "")] {
            let unit = json!({"id": id, "block": block, "phone": (!phone.is_empty()).then_some(phone)});
            remote
                .insert(Collection::Units, format!("u{id}"), to_fields(&unit).unwrap())
                .await;
        }

        Desk {
            local,
            remote,
            connectivity,
            desk,
        }
    }

    fn draft(unit: &str, kind: PackageKind) -> PackageDraft {
        PackageDraft {
            tracking_code: "BR123".to_string(),
            unit_id: UnitId::new(unit),
            unit_block: "A".to_string(),
            kind,
        }
    }

    async fn package(d: &Desk, id: &PackageId) -> Package {
        d.remote
            .get_document(Collection::Packages, id.as_str())
            .await
            .unwrap()
            .unwrap()
            .decode()
            .unwrap()
    }

    #[tokio::test]
    async fn online_registration_creates_package_under_its_key() {
        let d = desk().await;
        let reg = d
            .desk
            .register_package(draft("101", PackageKind::Perishable), Some(vec![1, 2, 3]))
            .await
            .unwrap();
        assert!(matches!(reg, Registration::Synced(_)));

        let p = package(&d, reg.package_id()).await;
        assert_eq!(p.record.status, PackageStatus::PendingNotification);
        assert_eq!(p.record.location, Location::FrontDesk);

        let photo_id = p.record.local_photo_id.unwrap();
        let photo = d.local.get_photo(&photo_id).await.unwrap().unwrap();
        assert_eq!(photo.package_id.as_ref(), Some(reg.package_id()));
    }

    #[tokio::test]
    async fn offline_registration_is_deferred_then_synced_with_same_id() {
        let d = desk().await;
        d.connectivity.set_online(false);

        let reg = d
            .desk
            .register_package(draft("101", PackageKind::Ordinary), Some(vec![7]))
            .await
            .unwrap();
        assert!(reg.is_deferred());
        assert_eq!(d.remote.write_calls().await, 0);
        assert_eq!(d.local.list_pending_operations().await.unwrap().len(), 1);

        d.connectivity.set_online(true);
        let second = d
            .desk
            .register_package(draft("102", PackageKind::Ordinary), None)
            .await
            .unwrap();
        assert!(matches!(second, Registration::Synced(_)));

        // the backlog was flushed after the second registration
        assert!(d.local.list_pending_operations().await.unwrap().is_empty());
        let first = package(&d, reg.package_id()).await;
        assert_eq!(first.record.tracking_code, "BR123");
    }

    #[tokio::test]
    async fn unreachable_remote_defers_registration() {
        let d = desk().await;
        d.remote.set_reachable(false).await;
        let reg = d
            .desk
            .register_package(draft("101", PackageKind::Ordinary), None)
            .await
            .unwrap();
        assert!(reg.is_deferred());
    }

    #[rstest]
    #[case::no_tracking("   ", "101")]
    #[case::no_unit("BR1", "")]
    #[tokio::test]
    async fn registration_rejects_blank_input(#[case] code: &str, #[case] unit: &str) {
        let d = desk().await;
        let mut draft = draft(unit, PackageKind::Ordinary);
        draft.tracking_code = code.to_string();
        let err = d.desk.register_package(draft, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn triage_attaches_photo_and_moves_forward() {
        let d = desk().await;
        let reg = d
            .desk
            .register_package(draft("101", PackageKind::Ordinary), None)
            .await
            .unwrap();
        let id = reg.package_id().clone();
        assert_eq!(package(&d, &id).await.record.status, PackageStatus::AwaitingTriage);

        let triaged = d.desk.triage_package(&id, vec![5, 5]).await.unwrap();
        assert_eq!(triaged.record.status, PackageStatus::PendingNotification);

        let stored = package(&d, &id).await;
        assert_eq!(stored.record.local_photo_id, triaged.record.local_photo_id);

        // second triage is a backward/no-op transition
        let err = d.desk.triage_package(&id, vec![6]).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[rstest]
    #[case("1", 0)]
    #[case("10", 2)]
    #[case(" 20 ", 1)]
    #[case("30", 0)]
    #[tokio::test]
    async fn unit_search_by_prefix(#[case] prefix: &str, #[case] expected: usize) {
        let d = desk().await;
        let units = d.desk.search_units(prefix).await.unwrap();
        assert_eq!(units.len(), expected);
    }

    #[tokio::test]
    async fn notification_flow() {
        let d = desk().await;
        let reg = d
            .desk
            .register_package(draft("101", PackageKind::Perishable), Some(vec![0xFF, 0xD8]))
            .await
            .unwrap();
        let id = reg.package_id().clone();

        let message = d.desk.compose_notification(&id).await.unwrap();
        assert!(message.text.contains("Tracking code: BR123"));
        assert!(message.text.contains("ATTENTION"));
        assert_eq!(message.phone.as_deref(), Some("+5511999990101"));
        assert_eq!(message.attachments[0].content, vec![0xFF, 0xD8]);

        d.desk.mark_notified(&id).await.unwrap();
        let p = package(&d, &id).await;
        assert_eq!(p.record.status, PackageStatus::PendingPickup);
        assert!(p.record.notified_at.is_some());

        let pending = d.desk.pending_pickups(&UnitId::new("101")).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(d.desk.pending_pickups(&UnitId::new("102")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn notification_needs_a_local_photo() {
        let d = desk().await;
        let reg = d
            .desk
            .register_package(draft("101", PackageKind::Perishable), Some(vec![1]))
            .await
            .unwrap();
        let id = reg.package_id().clone();
        let photo_id = package(&d, &id).await.record.local_photo_id.unwrap();
        d.local.delete_photo(&photo_id).await.unwrap();

        let err = d.desk.compose_notification(&id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PhotoMissing(p) if p == photo_id));

        // not triaged yet
        let bare = d
            .desk
            .register_package(draft("102", PackageKind::Ordinary), None)
            .await
            .unwrap();
        let err = d.desk.compose_notification(bare.package_id()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoPhoto(_)));
    }

    #[tokio::test]
    async fn perishable_intake_needs_a_photo() {
        let d = desk().await;
        let err = d
            .desk
            .register_package(draft("101", PackageKind::Perishable), None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
        assert_eq!(d.remote.write_calls().await, 0);
        assert!(d.local.list_pending_operations().await.unwrap().is_empty());
    }

    /// Local store whose queue refuses writes.
    struct FullQueue(Arc<InMemoryLocalStore>);

    #[async_trait::async_trait]
    impl LocalStore for FullQueue {
        async fn save_photo(
            &self,
            content: Vec<u8>,
            owner: Option<PackageId>,
        ) -> Result<PhotoId, StoreError> {
            self.0.save_photo(content, owner).await
        }

        async fn get_photo(&self, id: &PhotoId) -> Result<Option<StoredPhoto>, StoreError> {
            self.0.get_photo(id).await
        }

        async fn delete_photo(&self, id: &PhotoId) -> Result<(), StoreError> {
            self.0.delete_photo(id).await
        }

        async fn enqueue_operation(&self, _operation: SyncOperation) -> Result<OperationId, StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn list_pending_operations(&self) -> Result<Vec<PendingOperation>, StoreError> {
            self.0.list_pending_operations().await
        }

        async fn remove_operation(&self, id: OperationId) -> Result<(), StoreError> {
            self.0.remove_operation(id).await
        }

        async fn record_failed_attempt(
            &self,
            id: OperationId,
            error: &str,
        ) -> Result<Option<u32>, StoreError> {
            self.0.record_failed_attempt(id, error).await
        }

        async fn quarantine_operation(&self, id: OperationId, reason: &str) -> Result<bool, StoreError> {
            self.0.quarantine_operation(id, reason).await
        }

        async fn list_dead_letters(&self) -> Result<Vec<DeadLetter>, StoreError> {
            self.0.list_dead_letters().await
        }

        async fn requeue_dead_letter(&self, id: OperationId) -> Result<Option<OperationId>, StoreError> {
            self.0.requeue_dead_letter(id).await
        }

        async fn queue_health(&self) -> Result<QueueHealth, StoreError> {
            self.0.queue_health().await
        }
    }

    #[tokio::test]
    async fn failed_registration_drops_its_photo() {
        let d = desk().await;
        let photo_id = PhotoId::from(ulid::Ulid::new());
        let local = Arc::new(InMemoryLocalStore::with_parts(
            Arc::new(SystemClock),
            Arc::new(ScriptedIds::new([photo_id])),
        ));
        let full = Arc::new(FullQueue(local.clone()));
        let engine = Arc::new(SyncEngine::new(
            full.clone(),
            d.remote.clone(),
            d.connectivity.clone(),
        ));
        let desk = FrontDesk::new(
            full,
            d.remote.clone(),
            engine,
            Arc::new(SystemClock),
            Arc::new(UlidGenerator::new(SystemClock)),
        );
        d.connectivity.set_online(false);

        let err = desk
            .register_package(draft("101", PackageKind::Perishable), Some(vec![1, 2]))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Store(_)));
        assert!(local.get_photo(&photo_id).await.unwrap().is_none());
        assert_eq!(local.queue_health().await.unwrap().pending, 0);
    }

    async fn ready_for_pickup(d: &Desk, unit: &str) -> PackageId {
        let reg = d
            .desk
            .register_package(draft(unit, PackageKind::Ordinary), Some(vec![1]))
            .await
            .unwrap();
        d.desk.mark_notified(reg.package_id()).await.unwrap();
        reg.package_id().clone()
    }

    #[tokio::test]
    async fn pickup_retires_packages_in_one_batch() {
        let d = desk().await;
        let a = ready_for_pickup(&d, "101").await;
        let b = ready_for_pickup(&d, "101").await;

        let pickup = d
            .desk
            .record_pickup(&[a.clone(), b.clone()], " Maria ", "data:image/png;base64,AAAA")
            .await
            .unwrap();
        assert_eq!(pickup, Pickup::Synced(2));

        for id in [&a, &b] {
            let p = package(&d, id).await;
            assert_eq!(p.record.status, PackageStatus::Retired);
            assert_eq!(p.record.retired_by.as_deref(), Some("Maria"));
            assert!(p.record.signature.is_some());
        }
        assert_eq!(
            d.desk.list_by_status(PackageStatus::Retired).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn pickup_of_unnotified_package_is_refused() {
        let d = desk().await;
        let reg = d
            .desk
            .register_package(draft("101", PackageKind::Ordinary), Some(vec![1]))
            .await
            .unwrap();
        let err = d
            .desk
            .record_pickup(&[reg.package_id().clone()], "Maria", "sig")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition { from: PackageStatus::PendingNotification, .. }
        ));
    }

    #[tokio::test]
    async fn offline_pickup_queues_one_update_per_package() {
        let d = desk().await;
        let a = ready_for_pickup(&d, "101").await;
        let b = ready_for_pickup(&d, "201").await;
        d.connectivity.set_online(false);

        let pickup = d
            .desk
            .record_pickup(&[a.clone(), b.clone()], "Maria", "sig")
            .await
            .unwrap();
        let Pickup::Deferred(ops) = pickup else {
            panic!("expected deferred pickup");
        };
        assert_eq!(ops.len(), 2);

        d.connectivity.set_online(true);
        let report = d.desk.engine.sync_pending_items().await.unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(package(&d, &b).await.record.status, PackageStatus::Retired);
    }

    #[tokio::test]
    async fn pickup_requires_recipient_and_signature() {
        let d = desk().await;
        let a = ready_for_pickup(&d, "101").await;
        for (who, sig) in [("", "sig"), ("Maria", "")] {
            let err = d.desk.record_pickup(&[a.clone()], who, sig).await.unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidInput(_)));
        }
        let err = d.desk.record_pickup(&[], "Maria", "sig").await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }
}
