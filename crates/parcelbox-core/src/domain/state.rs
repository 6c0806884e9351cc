//! Package status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a package at the front desk.
///
/// State transitions:
/// - AwaitingTriage -> PendingNotification -> PendingPickup -> Retired
/// - intake may start directly at PendingNotification (attended pickup)
///
/// Transitions never go backwards and never skip a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// Registered, still needs a photo and a place in the parcel room.
    AwaitingTriage,

    /// Ready; the resident has not been told yet.
    PendingNotification,

    /// Resident notified, waiting for pickup.
    PendingPickup,

    /// Picked up and signed for.
    Retired,
}

impl PackageStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, PackageStatus::Retired)
    }

    /// Can a package enter the system in this state?
    pub fn is_initial(self) -> bool {
        matches!(
            self,
            PackageStatus::AwaitingTriage | PackageStatus::PendingNotification
        )
    }

    /// The single state that follows this one, if any.
    pub fn next(self) -> Option<PackageStatus> {
        match self {
            PackageStatus::AwaitingTriage => Some(PackageStatus::PendingNotification),
            PackageStatus::PendingNotification => Some(PackageStatus::PendingPickup),
            PackageStatus::PendingPickup => Some(PackageStatus::Retired),
            PackageStatus::Retired => None,
        }
    }

    pub fn can_transition_to(self, target: PackageStatus) -> bool {
        self.next() == Some(target)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PackageStatus::AwaitingTriage => "awaiting_triage",
            PackageStatus::PendingNotification => "pending_notification",
            PackageStatus::PendingPickup => "pending_pickup",
            PackageStatus::Retired => "retired",
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
