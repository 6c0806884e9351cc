//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryLocalStore**: プロセス内メモリのローカルストア（テスト・デモ用）
//! - **SqliteLocalStore**: 端末上の SQLite ファイル（再起動をまたいで残る）
//! - **InMemoryDocumentStore**: リモート DB の代役。到達不能・書き込み拒否を注入できる
//! - **WatchConnectivity**: `watch` チャネルで接続状態を配る signal
//!
//! ホスト型ドキュメント DB のネットワーククライアントはこのクレートには含めません。

pub mod memory_documents;
pub mod memory_local;
pub mod sqlite_local;
pub mod watch_connectivity;

// 主要な型を再エクスポート
pub use self::memory_documents::InMemoryDocumentStore;
pub use self::memory_local::InMemoryLocalStore;
pub use self::sqlite_local::SqliteLocalStore;
pub use self::watch_connectivity::WatchConnectivity;
