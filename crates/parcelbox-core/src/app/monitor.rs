//! ConnectivityMonitor - 再接続のたびに drain を 1 回走らせるループ
//!
//! # 学習ポイント
//! - shutdown は watch チャネル（`request_shutdown` → ループ脱出）
//! - 接続状態の変化と shutdown を `select!` で競合させる
//! - drain の失敗はログに出すだけ（キューに残るので次の再接続で再送される）

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ports::ConnectivitySignal;
use crate::sync::SyncEngine;

/// Monitor handle.
/// - `request_shutdown()` でループが止まる（実行中の drain は最後まで走る）
/// - `shutdown_and_join()` で終了を待てる
pub struct ConnectivityMonitor {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// Start watching `connectivity`. Only transitions observed after this
    /// call trigger a drain.
    pub fn spawn(engine: Arc<SyncEngine>, connectivity: &dyn ConnectivitySignal) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let online_rx = connectivity.subscribe();
        let online = *online_rx.borrow();

        let join = tokio::spawn(async move {
            monitor_loop(engine, online, online_rx, shutdown_rx).await;
        });

        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            warn!(error = %e, "connectivity monitor task failed");
        }
    }
}

async fn monitor_loop(
    engine: Arc<SyncEngine>,
    mut online: bool,
    mut online_rx: watch::Receiver<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!(online, "connectivity monitor started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // 次のループで判定
                continue;
            }
            changed = online_rx.changed() => {
                if changed.is_err() {
                    debug!("connectivity signal dropped");
                    break;
                }
            }
        }

        // watch は最新値しか残さないので、素早い往復は見えないことがある
        let now_online = *online_rx.borrow_and_update();
        if now_online == online {
            continue;
        }
        online = now_online;

        if !online {
            info!("connectivity lost");
            continue;
        }

        info!("connectivity restored, draining pending operations");
        match engine.sync_pending_items().await {
            Ok(report) => info!(%report, "reconnect drain done"),
            Err(e) => warn!(error = %e, "reconnect drain failed"),
        }
    }

    debug!("connectivity monitor stopped");
}
