//! UnitRegistry - 管理者向けのユニット台帳（追加・更新・削除・一括取り込み）
//!
//! # 学習ポイント
//! - リモートのみ（オフラインならエラーをそのまま返す。キューには積まない）
//! - ユニット番号（`id` フィールド）で引き、ドキュメント ID は隠す
//! - 一括取り込みは 1 回の batch。既存・重複の番号は飛ばす

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::domain::{Unit, UnitDraft, UnitId};
use crate::error::{RemoteError, WorkflowError};
use crate::ports::{BatchWrite, Collection, Document, DocumentStore, Filter, IdGenerator, to_fields};

/// Result of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    /// Rows whose unit number already existed (or repeated an earlier row).
    pub skipped: usize,
}

/// Admin operations on the `units` collection.
pub struct UnitRegistry {
    remote: Arc<dyn DocumentStore>,
    ids: Arc<dyn IdGenerator>,
}

impl UnitRegistry {
    pub fn new(remote: Arc<dyn DocumentStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { remote, ids }
    }

    /// All units, ordered by number.
    pub async fn list_units(&self) -> Result<Vec<Unit>, WorkflowError> {
        let docs = self.remote.query(Collection::Units, &[]).await?;
        let mut units = docs
            .iter()
            .map(|doc| doc.decode::<Unit>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(RemoteError::from)?;
        units.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(units)
    }

    pub async fn add_unit(&self, draft: UnitDraft) -> Result<Unit, WorkflowError> {
        let unit = Self::validate(&draft)?;
        if self.find(&unit.id).await?.is_some() {
            return Err(Self::duplicate(&unit.id));
        }
        let data = to_fields(&unit).map_err(RemoteError::from)?;
        let doc_id = self.remote.create_document(Collection::Units, data).await?;
        info!(unit_id = %unit.id, %doc_id, "unit added");
        Ok(unit)
    }

    /// Replace every field of unit `unit_id`. The number itself may change
    /// as long as the new one is free.
    pub async fn update_unit(
        &self,
        unit_id: &UnitId,
        draft: UnitDraft,
    ) -> Result<Unit, WorkflowError> {
        let unit = Self::validate(&draft)?;
        let doc = self
            .find(unit_id)
            .await?
            .ok_or_else(|| WorkflowError::UnitNotFound(unit_id.clone()))?;
        if unit.id != *unit_id && self.find(&unit.id).await?.is_some() {
            return Err(Self::duplicate(&unit.id));
        }
        let fields = to_fields(&unit).map_err(RemoteError::from)?;
        self.remote
            .update_fields(Collection::Units, &doc.id, fields)
            .await?;
        info!(%unit_id, new_unit_id = %unit.id, "unit updated");
        Ok(unit)
    }

    pub async fn delete_unit(&self, unit_id: &UnitId) -> Result<(), WorkflowError> {
        let doc = self
            .find(unit_id)
            .await?
            .ok_or_else(|| WorkflowError::UnitNotFound(unit_id.clone()))?;
        self.remote.delete_document(Collection::Units, &doc.id).await?;
        info!(%unit_id, "unit deleted");
        Ok(())
    }

    /// Create every row whose unit number is not registered yet, in one
    /// atomic batch. Any blank unit number rejects the whole import.
    pub async fn import_units(&self, rows: Vec<UnitDraft>) -> Result<ImportSummary, WorkflowError> {
        if rows.is_empty() {
            return Err(WorkflowError::InvalidInput("nothing to import".into()));
        }
        let units = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.normalize().ok_or_else(|| {
                    WorkflowError::InvalidInput(format!("row {}: unit number is required", i + 1))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut known: HashSet<UnitId> = self
            .list_units()
            .await?
            .into_iter()
            .map(|unit| unit.id)
            .collect();
        let mut summary = ImportSummary::default();
        let mut writes = Vec::new();
        for unit in units {
            if !known.insert(unit.id.clone()) {
                summary.skipped += 1;
                continue;
            }
            writes.push(BatchWrite::Create {
                collection: Collection::Units,
                id: self.ids.generate_document_id(),
                data: to_fields(&unit).map_err(RemoteError::from)?,
            });
        }

        summary.added = writes.len();
        if !writes.is_empty() {
            self.remote.commit_batch(writes).await?;
        }
        info!(added = summary.added, skipped = summary.skipped, "units imported");
        Ok(summary)
    }

    async fn find(&self, unit_id: &UnitId) -> Result<Option<Document>, WorkflowError> {
        let docs = self
            .remote
            .query(Collection::Units, &[Filter::equals("id", unit_id.as_str())])
            .await?;
        Ok(docs.into_iter().next())
    }

    fn validate(draft: &UnitDraft) -> Result<Unit, WorkflowError> {
        draft
            .normalize()
            .ok_or_else(|| WorkflowError::InvalidInput("unit number is required".into()))
    }

    fn duplicate(unit_id: &UnitId) -> WorkflowError {
        WorkflowError::InvalidInput(format!("unit {unit_id} already exists"))
    }
}
