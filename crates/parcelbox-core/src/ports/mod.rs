//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（リモート DB、端末ストレージ、ネットワーク状態）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - リモートのドキュメント DB が正本（packages / units / users）
//! - 端末ローカルには写真と未送信キューだけを置く

pub mod clock;
pub mod connectivity;
pub mod document_store;
pub mod id_generator;
pub mod local_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connectivity::ConnectivitySignal;
pub use self::document_store::{BatchWrite, Collection, Document, DocumentStore, Fields, Filter, to_fields};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::local_store::LocalStore;
