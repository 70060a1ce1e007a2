//! Offload task policies and configuration.

use std::time::Duration;

/// What happens when an offloaded dispatch runs for long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Nothing; the task runs until completion.
    #[default]
    None,
    /// Log a warning once the task completes after the given duration.
    /// The task itself is never cancelled.
    Warn(Duration),
}

/// Configuration for the [`OffloadManager`](super::OffloadManager).
#[derive(Debug, Clone, Default)]
pub struct OffloadConfig {
    /// Slow task policy.
    pub timeout_policy: TimeoutPolicy,
}
