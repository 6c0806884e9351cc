use thiserror::Error;

use crate::domain::{OperationId, PackageId, PackageStatus, PhotoId, UnitId, UserId};
use crate::ports::Collection;

/// Local store failures (device storage unavailable, full, corrupt).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("payload encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("local storage unavailable: {0}")]
    Unavailable(String),
}

/// Remote document store failures.
///
/// `Unavailable` means the store could not be reached at all; every other
/// variant is an answer about one specific request.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("{collection}/{id} not found")]
    NotFound { collection: Collection, id: String },

    #[error("{collection}/{id} already exists")]
    AlreadyExists { collection: Collection, id: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("document encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl RemoteError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

/// Failure of a whole drain. Per-operation failures are counted in the
/// report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote store unreachable, drain aborted: {0}")]
    RemoteUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("package {package_id} cannot move from {from} to {to}")]
    InvalidTransition {
        package_id: PackageId,
        from: PackageStatus,
        to: PackageStatus,
    },

    #[error("package {0} not found")]
    PackageNotFound(PackageId),

    #[error("unit {0} not found")]
    UnitNotFound(UnitId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("user {0} is blocked")]
    UserBlocked(UserId),

    #[error("package {0} has no photo")]
    NoPhoto(PackageId),

    #[error("photo {0} is not in local storage")]
    PhotoMissing(PhotoId),

    #[error("operation {0} not found")]
    OperationNotFound(OperationId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
