//! Locally cached photos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PackageId, PhotoId};

/// A captured image kept on the device. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPhoto {
    pub id: PhotoId,
    pub package_id: Option<PackageId>,
    pub captured_at: DateTime<Utc>,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl StoredPhoto {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
