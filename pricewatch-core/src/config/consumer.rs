//! Consumer loop configuration.

use std::time::Duration;

/// Tuning for a single [`AlertConsumer`](crate::processors::AlertConsumer).
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// How long one blocking pop waits before the loop re-checks shutdown.
    pub poll_timeout: Duration,
    /// Re-enqueues allowed for a reference after transient failures.
    pub max_retries: u32,
    /// First backoff delay when the queue or the alert store is unavailable.
    pub backoff_base: Duration,
    /// Upper bound for the backoff delay.
    pub backoff_max: Duration,
    /// Drop alerts whose `isActive` flag is off instead of notifying.
    pub skip_inactive: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
            skip_inactive: false,
        }
    }
}
