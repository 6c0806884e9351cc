//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + ジェネリック実装
//! ローカルで採番する ID（写真 ID、冪等キー）は ULID を使います。
//! `Id<T>` の `T` は PhantomData のマーカー型で、
//! `PhotoId` と `IdempotencyKey` をコンパイル時に区別します。
//!
//! 文字列表現は `{prefix}{ulid}`（例: `photo-01HV...`）で、
//! serde でもこの文字列としてシリアライズします。
//!
//! リモート側で採番される ID（パッケージ、ユニット）は不透明な文字列なので
//! newtype で包むだけにしています。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "photo-"）
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Error returned when a string is not a valid `{prefix}{ulid}` identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier {value:?}: expected prefix {expected_prefix:?} followed by a ULID")]
pub struct ParseIdError {
    pub value: String,
    pub expected_prefix: &'static str,
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseIdError {
            value: s.to_string(),
            expected_prefix: T::prefix(),
        };
        let raw = s.strip_prefix(T::prefix()).ok_or_else(invalid)?;
        let ulid = Ulid::from_string(raw).map_err(|_| invalid())?;
        Ok(Self::from_ulid(ulid))
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Photo のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Photo {}

impl IdMarker for Photo {
    fn prefix() -> &'static str {
        "photo-"
    }
}

/// Package 作成の冪等キーのマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Creation {}

impl IdMarker for Creation {
    fn prefix() -> &'static str {
        "pkg-"
    }
}

/// Identifier of a locally cached photo.
pub type PhotoId = Id<Photo>;

/// Caller-generated key for a package creation.
///
/// The remote store uses it as the document id, so replaying the same
/// creation never produces a second package.
pub type IdempotencyKey = Id<Creation>;

/// Identifier of a queued operation (assigned by the local store, never reused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(i64);

impl OperationId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Document id of a package in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IdempotencyKey> for PackageId {
    fn from(key: IdempotencyKey) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Apartment / unit number as registered in the `units` collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Account id of a staff member (issued by the sign-in provider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let photo = PhotoId::from_ulid(Ulid::new());
        let key = IdempotencyKey::from_ulid(Ulid::new());

        assert!(photo.to_string().starts_with("photo-"));
        assert!(key.to_string().starts_with("pkg-"));
        // let _: PhotoId = key; // <- does not compile
    }

    #[test]
    fn display_and_parse_agree() {
        let photo = PhotoId::from_ulid(Ulid::new());
        let parsed: PhotoId = photo.to_string().parse().unwrap();
        assert_eq!(parsed, photo);
    }

    #[test]
    fn parse_rejects_foreign_prefix() {
        let key = IdempotencyKey::from_ulid(Ulid::new());
        let err = key.to_string().parse::<PhotoId>().unwrap_err();
        assert_eq!(err.expected_prefix, "photo-");
    }

    #[test]
    fn ids_serialize_as_display_string() {
        let photo = PhotoId::from_ulid(Ulid::new());
        let json = serde_json::to_value(photo).unwrap();
        assert_eq!(json, serde_json::Value::String(photo.to_string()));
    }

    #[test]
    fn idempotency_key_becomes_package_id() {
        let key = IdempotencyKey::from_ulid(Ulid::new());
        let package_id = PackageId::from(key);
        assert_eq!(package_id.as_str(), key.to_string());
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<PhotoId>(), size_of::<Ulid>());
        assert_eq!(size_of::<IdempotencyKey>(), 16);
    }
}
