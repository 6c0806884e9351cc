//! Sync - 未送信キューをリモート DB へ流し込む
//!
//! - **engine**: SyncEngine（single-flight の drain）
//! - **retry**: RetryPolicy（何回失敗したら dead letter に移すか）
//! - **report**: SyncReport（drain の集計）

pub mod engine;
pub mod report;
pub mod retry;

pub use engine::SyncEngine;
pub use report::{SyncReport, SyncStatus};
pub use retry::RetryPolicy;
