//! Retry policy: decides when a failing operation is given up on.

use serde::Deserialize;

/// Retry policy for queued operations.
///
/// There is no backoff timer: an operation is retried on the next drain,
/// which happens after local writes and on reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "RetryPolicyConfig")]
pub struct RetryPolicy {
    /// Failed attempts after which an operation is moved to the
    /// dead-letter set.
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// `attempts` is the number of failed attempts recorded so far.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// 設定ファイル上の形。`RetryPolicy::new` を通して下限を揃える
#[derive(Deserialize)]
struct RetryPolicyConfig {
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    RetryPolicy::DEFAULT_MAX_ATTEMPTS
}

impl From<RetryPolicyConfig> for RetryPolicy {
    fn from(config: RetryPolicyConfig) -> Self {
        Self::new(config.max_attempts)
    }
}
