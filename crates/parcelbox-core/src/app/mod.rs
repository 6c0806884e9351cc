//! App - アプリケーション層
//!
//! このモジュールは、ports と sync を組み合わせて業務フローを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **FrontDesk**: 受付の業務フロー（登録・仕分け・通知・受け渡し）
//! - **UnitRegistry**: 管理者向けのユニット台帳
//! - **StaffDirectory**: スタッフのプロフィール（役割・ブロック）
//! - **ConnectivityMonitor**: 再接続で drain を起動するループ

pub mod builder;
pub mod desk;
pub mod monitor;
pub mod staff;
pub mod units;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::desk::{FrontDesk, MIN_UNIT_QUERY_LEN, Pickup, Registration};
pub use self::monitor::ConnectivityMonitor;
pub use self::staff::StaffDirectory;
pub use self::units::{ImportSummary, UnitRegistry};
