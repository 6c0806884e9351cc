//! Staff profiles (`users` collection).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::UserId;

/// What a staff member may do. Stored under the names the admin screens use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StaffRole {
    #[serde(rename = "admin")]
    Admin,

    /// Front-desk clerk; the role of anyone without a profile.
    #[default]
    #[serde(rename = "porteiro")]
    Doorkeeper,

    #[serde(rename = "controlador")]
    Controller,

    #[serde(rename = "expedicao")]
    Dispatch,
}

impl StaffRole {
    pub fn label(self) -> &'static str {
        match self {
            StaffRole::Admin => "Administrator",
            StaffRole::Doorkeeper => "Doorkeeper",
            StaffRole::Controller => "Controller",
            StaffRole::Dispatch => "Dispatch",
        }
    }

    /// Unit and staff administration.
    pub fn can_administer(self) -> bool {
        self == StaffRole::Admin
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Profile document, keyed by the sign-in account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: StaffRole,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_uses_stored_names() {
        assert_eq!(serde_json::to_value(StaffRole::Doorkeeper).unwrap(), "porteiro");
        let role: StaffRole = serde_json::from_str("\"expedicao\"").unwrap();
        assert_eq!(role, StaffRole::Dispatch);
    }

    #[test]
    fn sparse_profile_gets_defaults() {
        let profile: StaffProfile =
            serde_json::from_value(serde_json::json!({"id": "u1", "email": "a@b.c"})).unwrap();
        assert_eq!(profile.role, StaffRole::Doorkeeper);
        assert!(!profile.blocked);
        assert!(profile.created_at.is_none());
    }
}
