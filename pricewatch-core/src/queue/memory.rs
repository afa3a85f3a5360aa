//! In-process alert queue.
//!
//! Same contract as the Redis queue, without durability. Clones share the
//! same underlying list, so a producer handle and several consumers can
//! work on one queue inside a single process.

use super::{AlertQueue, QueueError};
use async_trait::async_trait;
use pricewatch_sdk::AlertRef;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

#[derive(Clone, Default)]
pub struct MemoryAlertQueue {
    inner: Arc<MemoryQueueInner>,
}

#[derive(Default)]
struct MemoryQueueInner {
    entries: Mutex<VecDeque<String>>,
    attempts: Mutex<HashMap<String, u32>>,
    dead_letters: Mutex<Vec<String>>,
    arrived: Notify,
}

impl MemoryAlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw entry, bypassing reference validation.
    ///
    /// Lets callers reproduce what a legacy producer pushed.
    pub async fn push_raw(&self, entry: impl Into<String>) {
        self.inner.entries.lock().await.push_back(entry.into());
        self.inner.arrived.notify_one();
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.lock().await.is_empty()
    }

    /// Snapshot of the dead-letter list, oldest first.
    pub async fn dead_letters(&self) -> Vec<String> {
        self.inner.dead_letters.lock().await.clone()
    }

    /// Current attempt count for `alert_ref`.
    pub async fn attempts(&self, alert_ref: &AlertRef) -> u32 {
        self.inner
            .attempts
            .lock()
            .await
            .get(alert_ref.as_str())
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl AlertQueue for MemoryAlertQueue {
    async fn enqueue(&self, alert_ref: &AlertRef) -> Result<(), QueueError> {
        self.push_raw(alert_ref.encode()).await;
        Ok(())
    }

    async fn dequeue_blocking(&self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking so a push between the check
            // and the wait is not missed.
            let arrived = self.inner.arrived.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();

            if let Some(entry) = self.inner.entries.lock().await.pop_front() {
                return Ok(Some(entry));
            }

            if tokio::time::timeout_at(deadline, arrived).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn record_attempt(&self, alert_ref: &AlertRef) -> Result<u32, QueueError> {
        let mut attempts = self.inner.attempts.lock().await;
        let count = attempts.entry(alert_ref.as_str().to_owned()).or_insert(0);
        *count = count.saturating_add(1);
        Ok(*count)
    }

    async fn clear_attempts(&self, alert_ref: &AlertRef) -> Result<(), QueueError> {
        self.inner.attempts.lock().await.remove(alert_ref.as_str());
        Ok(())
    }

    async fn dead_letter(&self, alert_ref: &AlertRef) -> Result<bool, QueueError> {
        self.inner
            .dead_letters
            .lock()
            .await
            .push(alert_ref.encode().to_owned());
        Ok(true)
    }
}
