//! SyncReport - drain の結果

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// At least one pass ran over the queue.
    Completed,
    /// No connectivity; the queue was not touched.
    Offline,
    /// Another drain was in flight and will run again on our behalf.
    Coalesced,
}

/// Outcome of `SyncEngine::sync_pending_items`.
///
/// Counts are summed over every pass the call ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    /// Entries confirmed by the remote store and removed from the queue.
    pub applied: usize,
    /// Entries the remote store answered with an error.
    pub failed: usize,
    /// Undecodable entries.
    pub skipped: usize,
    /// Entries moved to the dead-letter set during this call.
    pub quarantined: usize,
    pub passes: u32,
}

impl SyncReport {
    fn empty(status: SyncStatus) -> Self {
        Self {
            status,
            applied: 0,
            failed: 0,
            skipped: 0,
            quarantined: 0,
            passes: 0,
        }
    }

    pub fn offline() -> Self {
        Self::empty(SyncStatus::Offline)
    }

    pub fn coalesced() -> Self {
        Self::empty(SyncStatus::Coalesced)
    }

    pub(crate) fn pass() -> Self {
        Self {
            passes: 1,
            ..Self::empty(SyncStatus::Completed)
        }
    }

    /// Add the counts of one more pass.
    pub(crate) fn absorb(&mut self, pass: SyncReport) {
        self.status = SyncStatus::Completed;
        self.applied += pass.applied;
        self.failed += pass.failed;
        self.skipped += pass.skipped;
        self.quarantined += pass.quarantined;
        self.passes += pass.passes;
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: applied={} failed={} skipped={} quarantined={} passes={}",
            self.status, self.applied, self.failed, self.skipped, self.quarantined, self.passes
        )
    }
}
