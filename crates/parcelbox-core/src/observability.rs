use serde::{Deserialize, Serialize};

/// Queue health, for status displays and the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueHealth {
    /// Operations waiting to be drained (including undecodable ones).
    pub pending: usize,
    /// Pending operations whose row could not be decoded.
    pub undecodable: usize,
    /// Pending operations that failed at least once.
    pub retrying: usize,
    pub dead_lettered: usize,
}

impl QueueHealth {
    pub fn is_clean(&self) -> bool {
        self.pending == 0 && self.dead_lettered == 0
    }
}
