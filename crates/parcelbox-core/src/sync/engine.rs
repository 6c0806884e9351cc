//! SyncEngine - 未送信キューの drain
//!
//! # 学習ポイント
//! - single-flight: `Mutex::try_lock` + rerun フラグ（取りこぼしなし）
//! - パス中は remote への書き込みを順番に await する
//! - 適用済みの削除はパスの最後にまとめて行う
//! - 到達不能（Unavailable）はパス全体を中断し、キューには一切触らない

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{OperationId, QueuedOperation, SyncOperation};
use crate::error::{RemoteError, SyncError};
use crate::ports::{Collection, ConnectivitySignal, DocumentStore, LocalStore, to_fields};

use super::report::SyncReport;
use super::retry::RetryPolicy;

/// Drains the pending-operation queue into the remote document store.
pub struct SyncEngine {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn DocumentStore>,
    connectivity: Arc<dyn ConnectivitySignal>,
    policy: RetryPolicy,

    /// Held for the whole duration of a drain.
    drain_lock: Mutex<()>,

    /// Set by every caller before it tries to drain; cleared by the holder of
    /// `drain_lock` right before each pass.
    rerun_requested: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn DocumentStore>,
        connectivity: Arc<dyn ConnectivitySignal>,
    ) -> Self {
        Self {
            local,
            remote,
            connectivity,
            policy: RetryPolicy::default(),
            drain_lock: Mutex::new(()),
            rerun_requested: AtomicBool::new(false),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Replay every queued operation against the remote store.
    ///
    /// Safe to call from anywhere at any time. If a drain is already
    /// running, this returns `Coalesced` right away and the running drain
    /// makes one more pass, so nothing enqueued before the call is missed.
    pub async fn sync_pending_items(&self) -> Result<SyncReport, SyncError> {
        if !self.connectivity.is_online() {
            debug!("offline, drain skipped");
            return Ok(SyncReport::offline());
        }

        self.rerun_requested.store(true, Ordering::SeqCst);
        let mut report = SyncReport::coalesced();
        loop {
            let Ok(guard) = self.drain_lock.try_lock() else {
                if report.passes == 0 {
                    debug!("drain in flight, rerun requested");
                }
                return Ok(report);
            };

            while self.rerun_requested.swap(false, Ordering::SeqCst) {
                let pass = self.drain_once().await?;
                report.absorb(pass);
            }
            drop(guard);

            // A caller may have raised the flag between our last check and
            // the unlock; it saw the lock held and left the work to us.
            if !self.rerun_requested.load(Ordering::SeqCst) {
                break;
            }
        }

        info!(
            applied = report.applied,
            failed = report.failed,
            skipped = report.skipped,
            quarantined = report.quarantined,
            passes = report.passes,
            "drain finished"
        );
        Ok(report)
    }

    /// One pass over a snapshot of the queue.
    async fn drain_once(&self) -> Result<SyncReport, SyncError> {
        let snapshot = self.local.list_pending_operations().await?;
        let mut pass = SyncReport::pass();
        if snapshot.is_empty() {
            return Ok(pass);
        }
        debug!(entries = snapshot.len(), "drain pass started");

        let mut applied: Vec<OperationId> = Vec::new();
        let mut failures: Vec<(OperationId, String)> = Vec::new();

        for entry in &snapshot {
            match &entry.operation {
                QueuedOperation::Undecodable { kind, reason, .. } => {
                    warn!(operation_id = %entry.id, kind = %kind, %reason, "undecodable operation skipped");
                    pass.skipped += 1;
                    failures.push((entry.id, format!("undecodable {kind}: {reason}")));
                }
                QueuedOperation::Decoded(op) => match self.apply(op).await {
                    Ok(()) => {
                        debug!(operation_id = %entry.id, kind = op.kind(), "operation applied");
                        pass.applied += 1;
                        applied.push(entry.id);
                    }
                    Err(e) if e.is_unavailable() => {
                        warn!(operation_id = %entry.id, error = %e, "remote store unreachable, drain aborted");
                        return Err(SyncError::RemoteUnavailable(e.to_string()));
                    }
                    Err(e) => {
                        error!(
                            operation_id = %entry.id,
                            kind = op.kind(),
                            package_id = %op.package_id(),
                            error = %e,
                            "operation failed"
                        );
                        pass.failed += 1;
                        failures.push((entry.id, e.to_string()));
                    }
                },
            }
        }

        for id in applied {
            self.local.remove_operation(id).await?;
        }

        for (id, reason) in failures {
            let Some(attempts) = self.local.record_failed_attempt(id, &reason).await? else {
                continue;
            };
            if self.policy.is_exhausted(attempts)
                && self.local.quarantine_operation(id, &reason).await?
            {
                warn!(operation_id = %id, attempts, %reason, "operation moved to dead letters");
                pass.quarantined += 1;
            }
        }

        Ok(pass)
    }

    async fn apply(&self, op: &SyncOperation) -> Result<(), RemoteError> {
        match op {
            SyncOperation::CreatePackage(create) => {
                let data = to_fields(&create.package)?;
                let id = create.package_id();
                match self
                    .remote
                    .create_document_with_id(Collection::Packages, id.as_str(), data)
                    .await
                {
                    Err(RemoteError::AlreadyExists { .. }) => {
                        debug!(package_id = %id, "package already created");
                        Ok(())
                    }
                    other => other,
                }
            }
            SyncOperation::ApplyPickupUpdate(update) => {
                let fields = to_fields(&update.updates)?;
                self.remote
                    .update_fields(Collection::Packages, update.package_id.as_str(), fields)
                    .await
            }
        }
    }
}
