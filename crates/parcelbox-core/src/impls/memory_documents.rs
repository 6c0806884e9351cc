//! InMemoryDocumentStore - 開発・テスト用のリモート DB
//!
//! # 学習ポイント
//! - 障害注入（到達不能 / 特定ドキュメントへの書き込み拒否）
//! - batch は「全部検証してから全部適用」で原子性を保つ

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::error::RemoteError;
use crate::ports::{BatchWrite, Collection, Document, DocumentStore, Fields, Filter};

#[derive(Default)]
struct DocumentState {
    collections: HashMap<Collection, BTreeMap<String, Fields>>,

    /// When false, every call answers `Unavailable`.
    unreachable: bool,

    /// Writes to these document ids are rejected.
    rejected_ids: HashSet<String>,

    /// Number of write calls that reached the store (accepted or not).
    write_calls: usize,
}

impl DocumentState {
    fn check_reachable(&self) -> Result<(), RemoteError> {
        if self.unreachable {
            return Err(RemoteError::Unavailable("network unreachable".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self, id: &str) -> Result<(), RemoteError> {
        if self.rejected_ids.contains(id) {
            return Err(RemoteError::Rejected(format!("permission denied for {id}")));
        }
        Ok(())
    }

    fn contains(&self, collection: Collection, id: &str) -> bool {
        self.collections
            .get(&collection)
            .is_some_and(|docs| docs.contains_key(id))
    }

    /// Check one batch write without applying it.
    fn validate(&self, write: &BatchWrite) -> Result<(), RemoteError> {
        match write {
            BatchWrite::Create { collection, id, .. } => {
                self.check_writable(id)?;
                if self.contains(*collection, id) {
                    return Err(RemoteError::AlreadyExists {
                        collection: *collection,
                        id: id.clone(),
                    });
                }
            }
            BatchWrite::Update { collection, id, .. } => {
                self.check_writable(id)?;
                if !self.contains(*collection, id) {
                    return Err(RemoteError::NotFound {
                        collection: *collection,
                        id: id.clone(),
                    });
                }
            }
            BatchWrite::Delete { id, .. } => self.check_writable(id)?,
        }
        Ok(())
    }

    fn apply(&mut self, write: BatchWrite) {
        match write {
            BatchWrite::Create {
                collection,
                id,
                data,
            } => {
                self.collections
                    .entry(collection)
                    .or_default()
                    .insert(id, data);
            }
            BatchWrite::Update {
                collection,
                id,
                fields,
            } => {
                if let Some(doc) = self
                    .collections
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                {
                    doc.extend(fields);
                }
            }
            BatchWrite::Delete { collection, id } => {
                if let Some(docs) = self.collections.get_mut(&collection) {
                    docs.remove(&id);
                }
            }
        }
    }
}

/// Document store kept in memory, with fault injection for tests and demos.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    state: Mutex<DocumentState>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the network path to the store.
    pub async fn set_reachable(&self, reachable: bool) {
        self.state.lock().await.unreachable = !reachable;
    }

    /// Reject every future write to document `id`.
    pub async fn reject_writes_to(&self, id: impl Into<String>) {
        self.state.lock().await.rejected_ids.insert(id.into());
    }

    pub async fn write_calls(&self) -> usize {
        self.state.lock().await.write_calls
    }

    /// All documents of a collection, ordered by id.
    pub async fn documents(&self, collection: Collection) -> Vec<Document> {
        let state = self.state.lock().await;
        state
            .collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Seed a document without counting it as a write call.
    pub async fn insert(&self, collection: Collection, id: impl Into<String>, data: Fields) {
        let mut state = self.state.lock().await;
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id.into(), data);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_document(
        &self,
        collection: Collection,
        data: Fields,
    ) -> Result<String, RemoteError> {
        let id = Ulid::new().to_string();
        self.create_document_with_id(collection, &id, data).await?;
        Ok(id)
    }

    async fn create_document_with_id(
        &self,
        collection: Collection,
        id: &str,
        data: Fields,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        state.write_calls += 1;
        let write = BatchWrite::Create {
            collection,
            id: id.to_string(),
            data,
        };
        state.validate(&write)?;
        state.apply(write);
        Ok(())
    }

    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, RemoteError> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        Ok(state
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, RemoteError> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        let Some(docs) = state.collections.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .filter(|doc| filters.iter().all(|f| f.matches(doc)))
            .collect())
    }

    async fn update_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        state.write_calls += 1;
        let write = BatchWrite::Update {
            collection,
            id: id.to_string(),
            fields,
        };
        state.validate(&write)?;
        state.apply(write);
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        state.write_calls += 1;
        let write = BatchWrite::Delete {
            collection,
            id: id.to_string(),
        };
        state.validate(&write)?;
        state.apply(write);
        Ok(())
    }

    async fn commit_batch(&self, writes: Vec<BatchWrite>) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        state.write_calls += 1;
        for write in &writes {
            state.validate(write)?;
        }
        for write in writes {
            state.apply(write);
        }
        Ok(())
    }
}
