//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{IdempotencyKey, PhotoId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はローカルで使う ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_photo_id(&self) -> PhotoId;

    fn generate_idempotency_key(&self) -> IdempotencyKey;

    /// Client-side id for a new remote document (batched creates).
    fn generate_document_id(&self) -> String;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// タイムスタンプ部分は Clock から取るので、FixedClock を渡すと
/// 時刻部分が決定的になります（ランダム部分は毎回異なる）。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_photo_id(&self) -> PhotoId {
        PhotoId::from(self.next_ulid())
    }

    fn generate_idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::from(self.next_ulid())
    }

    fn generate_document_id(&self) -> String {
        self.next_ulid().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_photo_id();
        let id2 = id_gen.generate_photo_id();
        let id3 = id_gen.generate_photo_id();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_photo_id();
        let id2 = id_gen.generate_photo_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        // timestamp 部分は同じ
        assert_eq!(id1.as_ulid().timestamp_ms(), id2.as_ulid().timestamp_ms());
        assert_eq!(
            id1.as_ulid().timestamp_ms(),
            fixed_time.timestamp_millis() as u64
        );
    }

    #[test]
    fn different_id_types_are_generated() {
        let id_gen = UlidGenerator::new(SystemClock);

        let photo_id = id_gen.generate_photo_id();
        let key = id_gen.generate_idempotency_key();

        assert!(photo_id.to_string().starts_with("photo-"));
        assert!(key.to_string().starts_with("pkg-"));
    }
}
