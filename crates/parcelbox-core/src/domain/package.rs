//! Package records as stored in the `packages` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PackageId, PhotoId, UnitId};
use super::state::PackageStatus;

/// Classification chosen at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    #[default]
    Ordinary,

    /// Perishable or large; handed over at the front desk.
    Perishable,
}

impl PackageKind {
    /// Perishable/large parcels are photographed at the desk and skip triage.
    pub fn requires_intake_photo(self) -> bool {
        self == PackageKind::Perishable
    }

    pub fn location(self) -> Location {
        match self {
            PackageKind::Ordinary => Location::ParcelRoom,
            PackageKind::Perishable => Location::FrontDesk,
        }
    }
}

/// Where the parcel is kept until pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    #[default]
    ParcelRoom,
    FrontDesk,
}

impl Location {
    pub fn label(self) -> &'static str {
        match self {
            Location::ParcelRoom => "Parcel room",
            Location::FrontDesk => "Front desk",
        }
    }
}

/// What the desk clerk types in when a parcel arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDraft {
    pub tracking_code: String,
    pub unit_id: UnitId,
    pub unit_block: String,
    pub kind: PackageKind,
}

/// Fields of a package document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub tracking_code: String,
    pub unit_id: UnitId,
    #[serde(default)]
    pub unit_block: String,
    #[serde(default)]
    pub kind: PackageKind,
    pub status: PackageStatus,
    #[serde(default)]
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_photo_id: Option<PhotoId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retired_by: Option<String>,
    /// Signature image as a base64 data URL.
    #[serde(default)]
    pub signature: Option<String>,
}

impl PackageRecord {
    /// Build the record for a freshly registered parcel.
    ///
    /// A parcel photographed at the desk is ready for notification; one
    /// logged without a photo waits for triage, where it gets one.
    pub fn intake(
        draft: PackageDraft,
        local_photo_id: Option<PhotoId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let status = match local_photo_id {
            Some(_) => PackageStatus::PendingNotification,
            None => PackageStatus::AwaitingTriage,
        };
        Self {
            tracking_code: draft.tracking_code.trim().to_string(),
            unit_id: draft.unit_id,
            unit_block: draft.unit_block,
            kind: draft.kind,
            status,
            location: draft.kind.location(),
            local_photo_id,
            created_at,
            notified_at: None,
            retired_at: None,
            retired_by: None,
            signature: None,
        }
    }

    pub fn is_perishable(&self) -> bool {
        self.kind == PackageKind::Perishable
    }
}

/// A package document read back from the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    #[serde(flatten)]
    pub record: PackageRecord,
}

/// Targeted field update of a package document.
///
/// Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PackageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_photo_id: Option<PhotoId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retired_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retired_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl PackageUpdate {
    pub fn status(status: PackageStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn triaged(local_photo_id: Option<PhotoId>) -> Self {
        Self {
            local_photo_id,
            ..Self::status(PackageStatus::PendingNotification)
        }
    }

    pub fn notified(at: DateTime<Utc>) -> Self {
        Self {
            notified_at: Some(at),
            ..Self::status(PackageStatus::PendingPickup)
        }
    }

    pub fn retired(at: DateTime<Utc>, by: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            retired_at: Some(at),
            retired_by: Some(by.into()),
            signature: Some(signature.into()),
            ..Self::status(PackageStatus::Retired)
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn draft(kind: PackageKind) -> PackageDraft {
        PackageDraft {
            tracking_code: "  BR123  ".to_string(),
            unit_id: UnitId::new("101"),
            unit_block: "B".to_string(),
            kind,
        }
    }

    #[rstest]
    #[case::ordinary(PackageKind::Ordinary, PackageStatus::AwaitingTriage, Location::ParcelRoom)]
    #[case::perishable(PackageKind::Perishable, PackageStatus::AwaitingTriage, Location::FrontDesk)]
    fn intake_without_photo_waits_for_triage(
        #[case] kind: PackageKind,
        #[case] status: PackageStatus,
        #[case] location: Location,
    ) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let record = PackageRecord::intake(draft(kind), None, now);
        assert_eq!(record.status, status);
        assert_eq!(record.location, location);
        assert_eq!(record.tracking_code, "BR123");
        assert!(record.retired_at.is_none());
    }

    #[test]
    fn photographed_intake_skips_triage() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let photo: PhotoId = "photo-01HZX3JQ8W2Y3M4N5P6Q7R8S9T".parse().unwrap();
        let record = PackageRecord::intake(draft(PackageKind::Ordinary), Some(photo), now);
        assert_eq!(record.status, PackageStatus::PendingNotification);
        assert_eq!(record.local_photo_id, Some(photo));
    }

    #[test]
    fn update_serializes_only_set_fields() {
        let update = PackageUpdate::status(PackageStatus::Retired);
        let v = serde_json::to_value(&update).unwrap();
        assert_eq!(v, serde_json::json!({"status": "retired"}));
        assert!(PackageUpdate::default().is_empty());
    }

    #[test]
    fn minimal_record_fills_defaults() {
        let v = serde_json::json!({
            "tracking_code": "BR123",
            "unit_id": "101",
            "status": "pending_notification",
            "created_at": "2024-01-01T12:00:00Z",
        });
        let record: PackageRecord = serde_json::from_value(v).unwrap();
        assert_eq!(record.kind, PackageKind::Ordinary);
        assert_eq!(record.location, Location::ParcelRoom);
        assert!(record.local_photo_id.is_none());
    }
}
