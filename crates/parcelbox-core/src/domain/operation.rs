//! Queued remote writes.
//!
//! `SyncOperation` is what callers enqueue. What comes back out of the
//! local store is a `PendingOperation`, whose `QueuedOperation` may be
//! undecodable when the persisted row was written by a different build or
//! got corrupted. Such rows are kept (and eventually quarantined) instead of
//! failing the whole listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{IdempotencyKey, OperationId, PackageId};
use super::package::{PackageRecord, PackageUpdate};

/// Create a package document under a caller-chosen id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePackage {
    pub idempotency_key: IdempotencyKey,
    pub package: PackageRecord,
}

impl CreatePackage {
    pub fn package_id(&self) -> PackageId {
        PackageId::from(self.idempotency_key)
    }
}

/// Targeted field update of an existing package (pickup, mostly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupUpdate {
    pub package_id: PackageId,
    pub updates: PackageUpdate,
}

/// A remote write that can be deferred.
///
/// Serialized as `{"kind": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum SyncOperation {
    CreatePackage(CreatePackage),
    ApplyPickupUpdate(PickupUpdate),
}

impl SyncOperation {
    pub const CREATE_PACKAGE: &'static str = "create_package";
    pub const APPLY_PICKUP_UPDATE: &'static str = "apply_pickup_update";

    pub fn kind(&self) -> &'static str {
        match self {
            SyncOperation::CreatePackage(_) => Self::CREATE_PACKAGE,
            SyncOperation::ApplyPickupUpdate(_) => Self::APPLY_PICKUP_UPDATE,
        }
    }

    /// Payload without the kind tag (the shape persisted next to `kind`).
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            SyncOperation::CreatePackage(op) => serde_json::to_value(op),
            SyncOperation::ApplyPickupUpdate(op) => serde_json::to_value(op),
        }
    }

    /// Rebuild an operation from its persisted kind and payload.
    pub fn decode(kind: &str, payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        match kind {
            Self::CREATE_PACKAGE => serde_json::from_value(payload).map(SyncOperation::CreatePackage),
            Self::APPLY_PICKUP_UPDATE => {
                serde_json::from_value(payload).map(SyncOperation::ApplyPickupUpdate)
            }
            other => Err(serde::de::Error::custom(format!(
                "unrecognized operation kind {other:?}"
            ))),
        }
    }

    pub fn package_id(&self) -> PackageId {
        match self {
            SyncOperation::CreatePackage(op) => op.package_id(),
            SyncOperation::ApplyPickupUpdate(op) => op.package_id.clone(),
        }
    }
}

/// The operation part of a queued entry, as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueuedOperation {
    Decoded(SyncOperation),

    /// Unknown kind or malformed payload. Kept verbatim.
    Undecodable {
        kind: String,
        payload: serde_json::Value,
        reason: String,
    },
}

impl QueuedOperation {
    pub fn from_parts(kind: &str, payload: serde_json::Value) -> Self {
        match SyncOperation::decode(kind, payload.clone()) {
            Ok(op) => QueuedOperation::Decoded(op),
            Err(e) => QueuedOperation::Undecodable {
                kind: kind.to_string(),
                payload,
                reason: e.to_string(),
            },
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            QueuedOperation::Decoded(op) => op.kind(),
            QueuedOperation::Undecodable { kind, .. } => kind,
        }
    }

    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            QueuedOperation::Decoded(op) => op.payload(),
            QueuedOperation::Undecodable { payload, .. } => Ok(payload.clone()),
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, QueuedOperation::Decoded(_))
    }
}

impl From<SyncOperation> for QueuedOperation {
    fn from(op: SyncOperation) -> Self {
        QueuedOperation::Decoded(op)
    }
}

/// A queued write awaiting remote application.
///
/// The operation itself never changes after enqueue; only the drain
/// bookkeeping (`attempts`, `last_error`) does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub id: OperationId,
    pub operation: QueuedOperation,
    pub enqueued_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl PendingOperation {
    pub fn new(id: OperationId, operation: QueuedOperation, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id,
            operation,
            enqueued_at,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.attempts += 1;
        self.last_error = Some(error.into());
    }
}

/// A pending operation moved aside after exhausting its attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub operation: PendingOperation,
    pub quarantined_at: DateTime<Utc>,
    pub reason: String,
}
