//! Domain model (IDs, packages, queued operations, photos, ...).

pub mod ids;
pub mod notification;
pub mod operation;
pub mod package;
pub mod photo;
pub mod staff;
pub mod state;
pub mod unit;

pub use ids::{IdempotencyKey, OperationId, PackageId, ParseIdError, PhotoId, UnitId, UserId};
pub use notification::{Attachment, NotificationMessage};
pub use operation::{
    CreatePackage, DeadLetter, PendingOperation, PickupUpdate, QueuedOperation, SyncOperation,
};
pub use package::{Location, Package, PackageDraft, PackageKind, PackageRecord, PackageUpdate};
pub use photo::StoredPhoto;
pub use staff::{StaffProfile, StaffRole};
pub use state::PackageStatus;
pub use unit::{Unit, UnitDraft};
