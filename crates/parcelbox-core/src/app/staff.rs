//! StaffDirectory - スタッフのプロフィール（役割・ブロック）
//!
//! サインイン自体は外部のプロバイダが行う。ここでは `users` コレクションの
//! プロフィールだけを扱う。

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::domain::{StaffProfile, StaffRole, UserId};
use crate::error::{RemoteError, WorkflowError};
use crate::ports::{Clock, Collection, DocumentStore, to_fields};

/// Profiles of staff accounts, keyed by account id.
pub struct StaffDirectory {
    remote: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl StaffDirectory {
    pub fn new(remote: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { remote, clock }
    }

    /// Create the profile of a freshly signed-up account.
    pub async fn register_profile(
        &self,
        user_id: UserId,
        email: &str,
        name: Option<&str>,
        role: StaffRole,
    ) -> Result<StaffProfile, WorkflowError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(WorkflowError::InvalidInput("email is empty".into()));
        }
        let profile = StaffProfile {
            id: user_id,
            email: email.to_string(),
            name: name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            role,
            blocked: false,
            created_at: Some(self.clock.now()),
        };
        let data = to_fields(&profile).map_err(RemoteError::from)?;
        match self
            .remote
            .create_document_with_id(Collection::Users, profile.id.as_str(), data)
            .await
        {
            Ok(()) => {}
            Err(RemoteError::AlreadyExists { .. }) => {
                return Err(WorkflowError::InvalidInput(format!(
                    "user {} already has a profile",
                    profile.id
                )));
            }
            Err(e) => return Err(e.into()),
        }
        info!(user_id = %profile.id, role = %profile.role, "staff profile created");
        Ok(profile)
    }

    /// Sign-in gate: the account's role, `UserBlocked` if it was blocked.
    /// Accounts without a profile are front-desk clerks.
    pub async fn access(&self, user_id: &UserId) -> Result<StaffRole, WorkflowError> {
        let Some(profile) = self.find(user_id).await? else {
            return Ok(StaffRole::default());
        };
        if profile.blocked {
            warn!(%user_id, "blocked user refused");
            return Err(WorkflowError::UserBlocked(user_id.clone()));
        }
        Ok(profile.role)
    }

    /// Newest first.
    pub async fn list_profiles(&self) -> Result<Vec<StaffProfile>, WorkflowError> {
        let docs = self.remote.query(Collection::Users, &[]).await?;
        let mut profiles = docs
            .iter()
            .map(|doc| doc.decode::<StaffProfile>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(RemoteError::from)?;
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    pub async fn set_blocked(&self, user_id: &UserId, blocked: bool) -> Result<(), WorkflowError> {
        self.update(user_id, json!({ "blocked": blocked })).await?;
        info!(%user_id, blocked, "staff access changed");
        Ok(())
    }

    pub async fn change_role(&self, user_id: &UserId, role: StaffRole) -> Result<(), WorkflowError> {
        self.update(user_id, json!({ "role": role })).await?;
        info!(%user_id, %role, "staff role changed");
        Ok(())
    }

    pub async fn delete_profile(&self, user_id: &UserId) -> Result<(), WorkflowError> {
        if self.find(user_id).await?.is_none() {
            return Err(WorkflowError::UserNotFound(user_id.clone()));
        }
        self.remote
            .delete_document(Collection::Users, user_id.as_str())
            .await?;
        info!(%user_id, "staff profile deleted");
        Ok(())
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<StaffProfile>, WorkflowError> {
        let Some(doc) = self
            .remote
            .get_document(Collection::Users, user_id.as_str())
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(doc.decode().map_err(RemoteError::from)?))
    }

    async fn update(&self, user_id: &UserId, fields: serde_json::Value) -> Result<(), WorkflowError> {
        let fields = to_fields(&fields).map_err(RemoteError::from)?;
        match self
            .remote
            .update_fields(Collection::Users, user_id.as_str(), fields)
            .await
        {
            Ok(()) => Ok(()),
            Err(RemoteError::NotFound { .. }) => Err(WorkflowError::UserNotFound(user_id.clone())),
            Err(e) => Err(e.into()),
        }
    }
}
