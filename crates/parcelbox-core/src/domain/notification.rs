//! Outbound resident notification.
//!
//! The message is handed to an external sharing facility (messaging app,
//! share sheet, ...). Delivery is not ours.

use serde::{Deserialize, Serialize};

use super::package::Package;
use super::photo::StoredPhoto;
use super::unit::Unit;

/// An image attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Text plus zero or more images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub text: String,
    /// Resident phone, for facilities that cannot attach files.
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl NotificationMessage {
    pub const TITLE: &'static str = "New package";

    /// Compose the "your package arrived" message for a resident.
    pub fn package_arrived(package: &Package, unit: &Unit, photo: Option<&StoredPhoto>) -> Self {
        let record = &package.record;
        let unit_label = if record.unit_block.is_empty() {
            unit.label()
        } else {
            format!("{} - Block {}", record.unit_id, record.unit_block)
        };

        let mut lines = vec![
            "*Package arrived!*".to_string(),
            String::new(),
            format!("Unit: {unit_label}"),
            format!("Location: {}", record.location.label()),
            format!("Tracking code: {}", record.tracking_code),
        ];
        if record.is_perishable() {
            lines.push("ATTENTION: perishable or large item!".to_string());
        }

        let attachments = photo
            .map(|p| Attachment {
                file_name: format!("package_{}.jpg", record.unit_id),
                content_type: "image/jpeg".to_string(),
                content: p.content.clone(),
            })
            .into_iter()
            .collect();

        Self {
            title: Self::TITLE.to_string(),
            text: lines.join("\n"),
            phone: unit.phone.clone(),
            attachments,
        }
    }
}
