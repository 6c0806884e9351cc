//! Residential units (`units` collection).

use serde::{Deserialize, Serialize};

use super::ids::UnitId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    #[serde(default)]
    pub block: String,
    #[serde(default)]
    pub resident_name: Option<String>,
    /// Phone used for messaging notifications.
    #[serde(default)]
    pub phone: Option<String>,
}

impl Unit {
    /// "101" or "101 - Block B".
    pub fn label(&self) -> String {
        if self.block.is_empty() {
            self.id.to_string()
        } else {
            format!("{} - Block {}", self.id, self.block)
        }
    }
}

/// Unit as typed in the admin form, or one already-parsed import row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitDraft {
    pub id: String,
    pub block: String,
    pub resident_name: Option<String>,
    pub phone: Option<String>,
}

impl UnitDraft {
    /// Trimmed unit; blank optional fields become `None`. `None` when the
    /// unit number itself is blank.
    pub fn normalize(&self) -> Option<Unit> {
        let id = self.id.trim();
        if id.is_empty() {
            return None;
        }
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(Unit {
            id: UnitId::new(id),
            block: self.block.trim().to_string(),
            resident_name: non_blank(&self.resident_name),
            phone: non_blank(&self.phone),
        })
    }
}
