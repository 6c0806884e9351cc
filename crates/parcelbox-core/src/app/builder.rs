//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: 必須の port が揃っていなければ build() が失敗する

use std::sync::Arc;

use crate::ports::{
    Clock, ConnectivitySignal, DocumentStore, IdGenerator, LocalStore, SystemClock, UlidGenerator,
};
use crate::sync::{RetryPolicy, SyncEngine};

use super::desk::FrontDesk;
use super::monitor::ConnectivityMonitor;
use super::staff::StaffDirectory;
use super::units::UnitRegistry;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .local_store(local)
///     .document_store(remote)
///     .connectivity(signal)
///     .build()?;
/// let monitor = app.start_monitor();
/// ```
pub struct AppBuilder {
    local: Option<Arc<dyn LocalStore>>,
    remote: Option<Arc<dyn DocumentStore>>,
    connectivity: Option<Arc<dyn ConnectivitySignal>>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    policy: RetryPolicy,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These must be set before build().")]
    MissingComponents(Vec<&'static str>),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            local: None,
            remote: None,
            connectivity: None,
            clock: Arc::new(SystemClock),
            ids: None,
            policy: RetryPolicy::default(),
        }
    }

    pub fn local_store(mut self, local: Arc<dyn LocalStore>) -> Self {
        self.local = Some(local);
        self
    }

    pub fn document_store(mut self, remote: Arc<dyn DocumentStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn ConnectivitySignal>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// # 検証
    /// - local / remote / connectivity が全て設定されているかチェック
    /// - 不足があれば BuildError::MissingComponents を返す
    pub fn build(self) -> Result<App, BuildError> {
        let (local, remote, connectivity) = match (self.local, self.remote, self.connectivity) {
            (Some(local), Some(remote), Some(connectivity)) => (local, remote, connectivity),
            (local, remote, connectivity) => {
                let missing = [
                    ("local_store", local.is_none()),
                    ("document_store", remote.is_none()),
                    ("connectivity", connectivity.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                return Err(BuildError::MissingComponents(missing));
            }
        };

        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));
        let engine = Arc::new(
            SyncEngine::new(local.clone(), remote.clone(), connectivity.clone())
                .with_policy(self.policy),
        );
        let units = UnitRegistry::new(remote.clone(), ids.clone());
        let staff = StaffDirectory::new(remote.clone(), self.clock.clone());
        let desk = FrontDesk::new(local.clone(), remote, engine.clone(), self.clock, ids);

        Ok(App {
            local,
            connectivity,
            engine,
            desk,
            units,
            staff,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wired application: workflows plus the sync engine they share.
pub struct App {
    pub local: Arc<dyn LocalStore>,
    pub connectivity: Arc<dyn ConnectivitySignal>,
    pub engine: Arc<SyncEngine>,
    pub desk: FrontDesk,
    pub units: UnitRegistry,
    pub staff: StaffDirectory,
}

impl App {
    /// Start draining on every reconnect.
    pub fn start_monitor(&self) -> ConnectivityMonitor {
        ConnectivityMonitor::spawn(self.engine.clone(), self.connectivity.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StaffRole, UnitDraft, UserId};
    use crate::impls::{InMemoryDocumentStore, InMemoryLocalStore, WatchConnectivity};
    use crate::ports::Collection;

    #[test]
    fn test_build_success() {
        let app = AppBuilder::new()
            .local_store(Arc::new(InMemoryLocalStore::new()))
            .document_store(Arc::new(InMemoryDocumentStore::new()))
            .connectivity(Arc::new(WatchConnectivity::default()))
            .retry_policy(RetryPolicy::new(3))
            .build();
        assert!(matches!(app, Ok(app) if app.engine.policy().max_attempts == 3));
    }

    #[tokio::test]
    async fn test_built_services_share_the_remote() {
        let remote = Arc::new(InMemoryDocumentStore::new());
        let app = AppBuilder::new()
            .local_store(Arc::new(InMemoryLocalStore::new()))
            .document_store(remote.clone())
            .connectivity(Arc::new(WatchConnectivity::default()))
            .build()
            .unwrap();

        app.units
            .add_unit(UnitDraft {
                id: "101".to_string(),
                ..UnitDraft::default()
            })
            .await
            .unwrap();
        assert_eq!(app.desk.search_units("10").await.unwrap().len(), 1);

        app.staff
            .register_profile(UserId::new("u1"), "a@condo.test", None, StaffRole::Admin)
            .await
            .unwrap();
        assert_eq!(remote.documents(Collection::Users).await.len(), 1);
    }

    #[test]
    fn test_build_missing_components() {
        let app = AppBuilder::new()
            .document_store(Arc::new(InMemoryDocumentStore::new()))
            .build();
        assert!(matches!(
            app,
            Err(BuildError::MissingComponents(missing)) if missing == vec!["local_store", "connectivity"]
        ));
    }
}
