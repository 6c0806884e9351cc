//! SqliteLocalStore - ファイルに永続化するローカルストア
//!
//! # 実装詳細
//! - 1 本の Connection を Mutex で保護
//! - SQLite 呼び出しは spawn_blocking で実行（async context をブロックしない）
//! - `pending_operations.id` は AUTOINCREMENT なので削除後も再利用されない
//! - 削除済みの写真 ID は `photo_tombstones` に残し、再発行しない

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::domain::{
    DeadLetter, OperationId, PackageId, PendingOperation, PhotoId, QueuedOperation, StoredPhoto,
    SyncOperation,
};
use crate::error::StoreError;
use crate::observability::QueueHealth;
use crate::ports::{Clock, IdGenerator, LocalStore, SystemClock, UlidGenerator};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS photos (
    id          TEXT PRIMARY KEY,
    package_id  TEXT,
    captured_at TEXT NOT NULL,
    content     BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS photo_tombstones (
    id TEXT PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS pending_operations (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL,
    payload     TEXT NOT NULL,
    enqueued_at TEXT NOT NULL,
    attempts    INTEGER NOT NULL DEFAULT 0,
    last_error  TEXT
);
CREATE TABLE IF NOT EXISTS dead_letters (
    id             INTEGER PRIMARY KEY,
    kind           TEXT NOT NULL,
    payload        TEXT NOT NULL,
    enqueued_at    TEXT NOT NULL,
    attempts       INTEGER NOT NULL,
    last_error     TEXT,
    quarantined_at TEXT NOT NULL,
    reason         TEXT NOT NULL
);
";

/// Raw queue row, before the payload is decoded.
struct OperationRow {
    id: i64,
    kind: String,
    payload: String,
    enqueued_at: DateTime<Utc>,
    attempts: u32,
    last_error: Option<String>,
}

impl OperationRow {
    const COLUMNS: &'static str = "id, kind, payload, enqueued_at, attempts, last_error";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            payload: row.get(2)?,
            enqueued_at: row.get(3)?,
            attempts: row.get(4)?,
            last_error: row.get(5)?,
        })
    }

    fn into_pending(self) -> PendingOperation {
        let operation = match serde_json::from_str(&self.payload) {
            Ok(payload) => QueuedOperation::from_parts(&self.kind, payload),
            Err(e) => QueuedOperation::Undecodable {
                kind: self.kind,
                payload: serde_json::Value::String(self.payload),
                reason: format!("payload is not JSON: {e}"),
            },
        };
        PendingOperation {
            id: OperationId::new(self.id),
            operation,
            enqueued_at: self.enqueued_at,
            attempts: self.attempts,
            last_error: self.last_error,
        }
    }
}

/// Local store backed by a SQLite file.
pub struct SqliteLocalStore {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl SqliteLocalStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database; contents are lost when dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Run `f` on the connection in a blocking task.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {e}")))?
    }

    /// Insert a raw row, bypassing `SyncOperation` encoding.
    #[cfg(test)]
    async fn enqueue_raw(&self, kind: &str, payload: &str) -> Result<OperationId, StoreError> {
        let kind = kind.to_string();
        let payload = payload.to_string();
        let now = self.clock.now();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO pending_operations (kind, payload, enqueued_at) VALUES (?1, ?2, ?3)",
                params![kind, payload, now],
            )?;
            Ok(OperationId::new(conn.last_insert_rowid()))
        })
        .await
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn save_photo(
        &self,
        content: Vec<u8>,
        owner: Option<PackageId>,
    ) -> Result<PhotoId, StoreError> {
        let ids = Arc::clone(&self.ids);
        let captured_at = self.clock.now();
        let bytes = content.len();
        let id = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let id = loop {
                    let candidate = ids.generate_photo_id();
                    let key = candidate.to_string();
                    let taken: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM photos WHERE id = ?1)
                             OR EXISTS(SELECT 1 FROM photo_tombstones WHERE id = ?1)",
                        params![key],
                        |row| row.get(0),
                    )?;
                    if !taken {
                        break candidate;
                    }
                };
                tx.execute(
                    "INSERT INTO photos (id, package_id, captured_at, content) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        id.to_string(),
                        owner.as_ref().map(PackageId::as_str),
                        captured_at,
                        content
                    ],
                )?;
                tx.commit()?;
                Ok(id)
            })
            .await?;
        debug!(photo_id = %id, bytes, "photo saved");
        Ok(id)
    }

    async fn get_photo(&self, id: &PhotoId) -> Result<Option<StoredPhoto>, StoreError> {
        let photo_id = *id;
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT package_id, captured_at, content FROM photos WHERE id = ?1",
                    params![photo_id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, DateTime<Utc>>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                        ))
                    },
                )
                .optional()?;
            Ok(row.map(|(package_id, captured_at, content)| StoredPhoto {
                id: photo_id,
                package_id: package_id.map(PackageId::new),
                captured_at,
                content,
            }))
        })
        .await
    }

    async fn delete_photo(&self, id: &PhotoId) -> Result<(), StoreError> {
        let key = id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM photos WHERE id = ?1", params![key])?;
            if removed > 0 {
                tx.execute(
                    "INSERT OR IGNORE INTO photo_tombstones (id) VALUES (?1)",
                    params![key],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn enqueue_operation(&self, operation: SyncOperation) -> Result<OperationId, StoreError> {
        let kind = operation.kind();
        let payload = serde_json::to_string(&operation.payload()?)?;
        let now = self.clock.now();
        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO pending_operations (kind, payload, enqueued_at) VALUES (?1, ?2, ?3)",
                    params![kind, payload, now],
                )?;
                Ok(OperationId::new(conn.last_insert_rowid()))
            })
            .await?;
        debug!(operation_id = %id, kind, "operation enqueued");
        Ok(id)
    }

    async fn list_pending_operations(&self) -> Result<Vec<PendingOperation>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM pending_operations ORDER BY id ASC",
                OperationRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], OperationRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows.into_iter().map(OperationRow::into_pending).collect())
        })
        .await
    }

    async fn remove_operation(&self, id: OperationId) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM pending_operations WHERE id = ?1",
                params![id.get()],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_failed_attempt(
        &self,
        id: OperationId,
        error: &str,
    ) -> Result<Option<u32>, StoreError> {
        let error = error.to_string();
        self.with_conn(move |conn| {
            let attempts = conn
                .query_row(
                    "UPDATE pending_operations
                        SET attempts = attempts + 1, last_error = ?2
                      WHERE id = ?1
                  RETURNING attempts",
                    params![id.get(), error],
                    |row| row.get::<_, u32>(0),
                )
                .optional()?;
            Ok(attempts)
        })
        .await
    }

    async fn quarantine_operation(&self, id: OperationId, reason: &str) -> Result<bool, StoreError> {
        let reason = reason.to_string();
        let now = self.clock.now();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                "INSERT INTO dead_letters
                     (id, kind, payload, enqueued_at, attempts, last_error, quarantined_at, reason)
                 SELECT id, kind, payload, enqueued_at, attempts, last_error, ?2, ?3
                   FROM pending_operations WHERE id = ?1",
                params![id.get(), now, reason],
            )?;
            tx.execute(
                "DELETE FROM pending_operations WHERE id = ?1",
                params![id.get()],
            )?;
            tx.commit()?;
            Ok(moved > 0)
        })
        .await
    }

    async fn list_dead_letters(&self) -> Result<Vec<DeadLetter>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, quarantined_at, reason FROM dead_letters ORDER BY id ASC",
                OperationRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        OperationRow::from_row(row)?,
                        row.get::<_, DateTime<Utc>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows
                .into_iter()
                .map(|(op, quarantined_at, reason)| DeadLetter {
                    operation: op.into_pending(),
                    quarantined_at,
                    reason,
                })
                .collect())
        })
        .await
    }

    async fn requeue_dead_letter(&self, id: OperationId) -> Result<Option<OperationId>, StoreError> {
        let now = self.clock.now();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                "INSERT INTO pending_operations (kind, payload, enqueued_at)
                 SELECT kind, payload, ?2 FROM dead_letters WHERE id = ?1",
                params![id.get(), now],
            )?;
            if moved == 0 {
                return Ok(None);
            }
            let fresh = OperationId::new(tx.last_insert_rowid());
            tx.execute("DELETE FROM dead_letters WHERE id = ?1", params![id.get()])?;
            tx.commit()?;
            Ok(Some(fresh))
        })
        .await
    }

    async fn queue_health(&self) -> Result<QueueHealth, StoreError> {
        let pending = self.list_pending_operations().await?;
        let dead_lettered = self
            .with_conn(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM dead_letters", [], |row| row.get(0))?;
                Ok(usize::try_from(count).unwrap_or(0))
            })
            .await?;
        Ok(QueueHealth {
            pending: pending.len(),
            undecodable: pending.iter().filter(|op| !op.operation.is_decoded()).count(),
            retrying: pending.iter().filter(|op| op.attempts > 0).count(),
            dead_lettered,
        })
    }
}
