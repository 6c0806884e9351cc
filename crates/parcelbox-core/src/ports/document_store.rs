//! DocumentStore port - リモートのドキュメント DB（正本）
//!
//! packages / units / users の 3 コレクションを持ちます。
//! ドキュメントは JSON オブジェクト（`Fields`）として扱います。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RemoteError;

/// Field map of one document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Packages,
    Units,
    Users,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Packages => "packages",
            Collection::Units => "units",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    /// Decode into `T`. The document id is exposed as field `id` unless the
    /// data carries its own `id` field.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let mut data = self.data.clone();
        data.entry("id")
            .or_insert_with(|| serde_json::Value::String(self.id.clone()));
        serde_json::from_value(serde_json::Value::Object(data))
    }
}

/// Query predicate. A query takes a slice of them, combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals {
        field: String,
        value: serde_json::Value,
    },
    /// String field starting with `prefix` (range query on the remote side).
    Prefix { field: String, prefix: String },
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Filter::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let lookup = |field: &str| {
            if field == "id" && !doc.data.contains_key("id") {
                Some(serde_json::Value::String(doc.id.clone()))
            } else {
                doc.data.get(field).cloned()
            }
        };
        match self {
            Filter::Equals { field, value } => lookup(field).as_ref() == Some(value),
            Filter::Prefix { field, prefix } => lookup(field)
                .as_ref()
                .and_then(serde_json::Value::as_str)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
        }
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    Create {
        collection: Collection,
        id: String,
        data: Fields,
    },
    Update {
        collection: Collection,
        id: String,
        fields: Fields,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

/// Remote, authoritative document database.
///
/// Create and targeted update must be individually retriable: the sync
/// engine replays them one by one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create with a store-assigned id.
    async fn create_document(&self, collection: Collection, data: Fields)
    -> Result<String, RemoteError>;

    /// Create under `id`. `AlreadyExists` if the id is taken.
    async fn create_document_with_id(
        &self,
        collection: Collection,
        id: &str,
        data: Fields,
    ) -> Result<(), RemoteError>;

    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, RemoteError>;

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, RemoteError>;

    /// Merge `fields` into an existing document. `NotFound` if missing.
    async fn update_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError>;

    /// Idempotent.
    async fn delete_document(&self, collection: Collection, id: &str) -> Result<(), RemoteError>;

    /// All writes are applied, or none.
    async fn commit_batch(&self, writes: Vec<BatchWrite>) -> Result<(), RemoteError>;
}

/// Serialize a value that must be a JSON object into a field map.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
