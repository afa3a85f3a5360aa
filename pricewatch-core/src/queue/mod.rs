//! Queue client for alert references.
//!
//! The queue is a single FIFO list of bare alert identifiers. Producers
//! append to the tail; consumers pop from the head with a bounded blocking
//! wait, so several consumers can share one queue and never receive the
//! same entry twice.
//!
//! - [`RedisAlertQueue`]: durable, used by the worker
//! - [`MemoryAlertQueue`]: in-process, for embedding and tests

mod memory;
mod redis_backend;

pub use memory::MemoryAlertQueue;
pub use redis_backend::RedisAlertQueue;

use async_trait::async_trait;
use pricewatch_sdk::AlertRef;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The backing store is unreachable or did not answer in time.
    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::Unavailable(e.to_string())
    }
}

#[async_trait]
pub trait AlertQueue: Send + Sync {
    /// Append a reference to the tail.
    async fn enqueue(&self, alert_ref: &AlertRef) -> Result<(), QueueError>;

    /// Pop the head entry, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. The entry is
    /// returned raw; callers normalize it with [`AlertRef::normalize`].
    async fn dequeue_blocking(&self, timeout: Duration) -> Result<Option<String>, QueueError>;

    /// Count one more failed attempt for `alert_ref` and return the total.
    async fn record_attempt(&self, alert_ref: &AlertRef) -> Result<u32, QueueError>;

    /// Forget the attempt count for `alert_ref`.
    async fn clear_attempts(&self, alert_ref: &AlertRef) -> Result<(), QueueError>;

    /// Park a reference that exhausted its retries.
    ///
    /// Returns `false` when no dead-letter list is configured.
    async fn dead_letter(&self, alert_ref: &AlertRef) -> Result<bool, QueueError>;
}
