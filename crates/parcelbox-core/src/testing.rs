//! テスト用の Clock / IdGenerator

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use ulid::Ulid;

use crate::domain::{IdempotencyKey, PhotoId};
use crate::ports::{Clock, IdGenerator};

/// Advances by one second on every `now()` call.
pub(crate) struct StepClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl StepClock {
    pub(crate) fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::seconds(tick)
    }
}

/// Hands out the scripted photo ids in order, then fresh ones.
pub(crate) struct ScriptedIds {
    photos: Mutex<VecDeque<PhotoId>>,
}

impl ScriptedIds {
    pub(crate) fn new(photos: impl IntoIterator<Item = PhotoId>) -> Self {
        Self {
            photos: Mutex::new(photos.into_iter().collect()),
        }
    }
}

impl IdGenerator for ScriptedIds {
    fn generate_photo_id(&self) -> PhotoId {
        self.photos
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| PhotoId::from(Ulid::new()))
    }

    fn generate_idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::from(Ulid::new())
    }

    fn generate_document_id(&self) -> String {
        Ulid::new().to_string()
    }
}
