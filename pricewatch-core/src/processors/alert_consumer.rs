//! AlertConsumer processor.
//!
//! The AlertConsumer is responsible for:
//! - Popping raw alert references from the queue with a bounded wait
//! - Normalizing legacy encodings into an [`AlertRef`]
//! - Fetching the alert's current context from the repository
//! - Handing the context to the [`NotificationDispatcher`]
//! - Re-enqueueing references after transient failures, up to `max_retries`,
//!   with a growing delay between delivery attempts
//! - Dead-lettering references that exhausted their retries
//! - Backing off while the queue or the alert store is unavailable

use crate::config::ConsumerConfig;
use crate::dispatcher::{DeliveryError, NotificationDispatcher};
use crate::queue::{AlertQueue, QueueError};
use crate::repository::{AlertRepository, RepositoryError};
use crate::utils::backoff::backoff_delay;
use kanau::processor::Processor;
use pricewatch_sdk::AlertRef;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Why a reference was dropped without a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Malformed,
    NotFound,
    Inactive,
    InvalidRecord,
    UnsupportedChannel,
    InvalidRecipient,
}

/// Which step hit the transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCause {
    Repository,
    Delivery,
}

/// Result of processing one dequeued entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Delivered,
    Skipped(SkipReason),
    /// Pushed back to the tail of the queue.
    Requeued { attempt: u32, cause: RetryCause },
    /// Retries exhausted.
    GaveUp {
        cause: RetryCause,
        dead_lettered: bool,
    },
}

impl ProcessOutcome {
    fn store_unavailable(&self) -> bool {
        matches!(
            self,
            ProcessOutcome::Requeued {
                cause: RetryCause::Repository,
                ..
            } | ProcessOutcome::GaveUp {
                cause: RetryCause::Repository,
                ..
            }
        )
    }
}

/// Consumes alert references and turns them into notifications.
pub struct AlertConsumer<Q, R> {
    queue: Q,
    repository: R,
    dispatcher: Arc<NotificationDispatcher>,
    config: ConsumerConfig,
    worker: usize,
}

impl<Q: AlertQueue, R: AlertRepository> AlertConsumer<Q, R> {
    /// Create a new AlertConsumer.
    ///
    /// # Arguments
    ///
    /// * `queue` - Queue client owned by this consumer
    /// * `repository` - Source of alert context
    /// * `dispatcher` - Dispatcher shared by all consumers
    /// * `config` - Poll, retry and backoff tuning
    pub fn new(
        queue: Q,
        repository: R,
        dispatcher: Arc<NotificationDispatcher>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            queue,
            repository,
            dispatcher,
            config,
            worker: 0,
        }
    }

    /// Label this consumer in logs.
    pub fn with_worker_id(mut self, worker: usize) -> Self {
        self.worker = worker;
        self
    }

    /// Run the AlertConsumer until `shutdown_rx` turns `true`.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(worker = self.worker, "AlertConsumer started");

        let mut queue_failures: u32 = 0;
        let mut store_failures: u32 = 0;

        while !*shutdown_rx.borrow() {
            let delay = match self.run_once().await {
                Ok(Some(outcome)) if outcome.store_unavailable() => {
                    queue_failures = 0;
                    let delay = backoff_delay(
                        self.config.backoff_base,
                        self.config.backoff_max,
                        store_failures,
                    );
                    store_failures = store_failures.saturating_add(1);
                    warn!(
                        worker = self.worker,
                        delay_ms = delay.as_millis() as u64,
                        "Alert store unavailable, backing off"
                    );
                    delay
                }
                Ok(Some(ProcessOutcome::Requeued {
                    attempt,
                    cause: RetryCause::Delivery,
                })) => {
                    queue_failures = 0;
                    store_failures = 0;
                    // Space retries out so a short relay outage does not
                    // exhaust them.
                    let delay = backoff_delay(
                        self.config.backoff_base,
                        self.config.backoff_max,
                        attempt.saturating_sub(1),
                    );
                    debug!(
                        worker = self.worker,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Delaying before delivery retry"
                    );
                    delay
                }
                Ok(_) => {
                    queue_failures = 0;
                    store_failures = 0;
                    continue;
                }
                Err(e) => {
                    let delay = backoff_delay(
                        self.config.backoff_base,
                        self.config.backoff_max,
                        queue_failures,
                    );
                    queue_failures = queue_failures.saturating_add(1);
                    error!(
                        worker = self.worker,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Queue unavailable, backing off"
                    );
                    delay
                }
            };

            if Self::pause(delay, &mut shutdown_rx).await {
                break;
            }
        }

        info!(worker = self.worker, "AlertConsumer shutdown complete");
    }

    /// Sleep for `delay`, returning early with `true` on shutdown.
    async fn pause(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                changed.is_err() || *shutdown_rx.borrow()
            }

            _ = tokio::time::sleep(delay) => false,
        }
    }

    /// One poll: wait for an entry and process it.
    ///
    /// Returns `Ok(None)` when the poll timed out on an empty queue.
    pub async fn run_once(&self) -> Result<Option<ProcessOutcome>, QueueError> {
        let Some(entry) = self
            .queue
            .dequeue_blocking(self.config.poll_timeout)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(self.handle(entry).await))
    }

    async fn handle(&self, entry: String) -> ProcessOutcome {
        let alert_ref = match AlertRef::normalize(&entry) {
            Ok(alert_ref) => alert_ref,
            Err(e) => {
                warn!(worker = self.worker, entry = ?entry, error = %e, "Dropping malformed queue entry");
                return ProcessOutcome::Skipped(SkipReason::Malformed);
            }
        };

        debug!(worker = self.worker, alert_ref = %alert_ref, "Processing alert");

        let context = match self.repository.fetch(&alert_ref).await {
            Ok(context) => context,
            Err(RepositoryError::NotFound(_)) => {
                info!(worker = self.worker, alert_ref = %alert_ref, "Alert no longer exists, skipping");
                self.forget(&alert_ref).await;
                return ProcessOutcome::Skipped(SkipReason::NotFound);
            }
            Err(e @ RepositoryError::InvalidRecord { .. }) => {
                error!(worker = self.worker, alert_ref = %alert_ref, error = %e, "Dropping alert");
                self.forget(&alert_ref).await;
                return ProcessOutcome::Skipped(SkipReason::InvalidRecord);
            }
            Err(e @ RepositoryError::Unavailable(_)) => {
                warn!(worker = self.worker, alert_ref = %alert_ref, error = %e, "Failed to fetch alert");
                return self.retry_or_drop(&alert_ref, RetryCause::Repository).await;
            }
        };

        if self.config.skip_inactive && !context.is_active {
            info!(worker = self.worker, alert_ref = %alert_ref, "Alert is inactive, skipping");
            self.forget(&alert_ref).await;
            return ProcessOutcome::Skipped(SkipReason::Inactive);
        }

        match self.dispatcher.dispatch(&context).await {
            Ok(()) => {
                info!(
                    worker = self.worker,
                    alert_ref = %alert_ref,
                    channel = %context.method,
                    "Notification sent"
                );
                self.forget(&alert_ref).await;
                ProcessOutcome::Delivered
            }
            Err(e @ DeliveryError::UnsupportedChannel(_)) => {
                warn!(worker = self.worker, alert_ref = %alert_ref, error = %e, "Dropping alert");
                self.forget(&alert_ref).await;
                ProcessOutcome::Skipped(SkipReason::UnsupportedChannel)
            }
            Err(e @ DeliveryError::InvalidRecipient(_)) => {
                warn!(worker = self.worker, alert_ref = %alert_ref, error = %e, "Dropping alert");
                self.forget(&alert_ref).await;
                ProcessOutcome::Skipped(SkipReason::InvalidRecipient)
            }
            Err(e @ DeliveryError::Transport { .. }) => {
                warn!(
                    worker = self.worker,
                    alert_ref = %alert_ref,
                    channel = %context.method,
                    error = %e,
                    "Failed to send notification"
                );
                self.retry_or_drop(&alert_ref, RetryCause::Delivery).await
            }
        }
    }

    async fn retry_or_drop(&self, alert_ref: &AlertRef, cause: RetryCause) -> ProcessOutcome {
        let attempt = match self.queue.record_attempt(alert_ref).await {
            Ok(attempt) => attempt,
            Err(e) => {
                error!(
                    worker = self.worker,
                    alert_ref = %alert_ref,
                    error = %e,
                    "Failed to record attempt, giving up on alert"
                );
                return ProcessOutcome::GaveUp {
                    cause,
                    dead_lettered: false,
                };
            }
        };

        if attempt <= self.config.max_retries {
            match self.queue.enqueue(alert_ref).await {
                Ok(()) => {
                    info!(
                        worker = self.worker,
                        alert_ref = %alert_ref,
                        attempt,
                        max_retries = self.config.max_retries,
                        "Alert re-enqueued"
                    );
                    return ProcessOutcome::Requeued { attempt, cause };
                }
                Err(e) => {
                    error!(
                        worker = self.worker,
                        alert_ref = %alert_ref,
                        error = %e,
                        "Failed to re-enqueue alert"
                    );
                }
            }
        } else {
            error!(
                worker = self.worker,
                alert_ref = %alert_ref,
                attempts = attempt,
                "Alert permanently failed"
            );
        }

        let dead_lettered = match self.queue.dead_letter(alert_ref).await {
            Ok(parked) => parked,
            Err(e) => {
                error!(
                    worker = self.worker,
                    alert_ref = %alert_ref,
                    error = %e,
                    "Failed to dead-letter alert"
                );
                false
            }
        };
        self.forget(alert_ref).await;
        ProcessOutcome::GaveUp {
            cause,
            dead_lettered,
        }
    }

    async fn forget(&self, alert_ref: &AlertRef) {
        if let Err(e) = self.queue.clear_attempts(alert_ref).await {
            warn!(worker = self.worker, alert_ref = %alert_ref, error = %e, "Failed to clear attempts");
        }
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl<Q: AlertQueue, R: AlertRepository> Processor<String> for AlertConsumer<Q, R> {
    type Output = ProcessOutcome;
    type Error = Infallible;

    async fn process(&self, entry: String) -> Result<ProcessOutcome, Infallible> {
        Ok(self.handle(entry).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryAlertQueue;
    use crate::testing::{MemoryAlertRepository, RecordingChannel, gold_cross};
    use pricewatch_sdk::AlertMethod;
    use std::collections::HashSet;

    struct Harness {
        queue: MemoryAlertQueue,
        repository: Arc<MemoryAlertRepository>,
        email: Arc<RecordingChannel>,
        consumer: AlertConsumer<MemoryAlertQueue, Arc<MemoryAlertRepository>>,
    }

    fn config() -> ConsumerConfig {
        ConsumerConfig {
            poll_timeout: Duration::from_millis(20),
            max_retries: 2,
            ..ConsumerConfig::default()
        }
    }

    fn harness(email: RecordingChannel, config: ConsumerConfig) -> Harness {
        let queue = MemoryAlertQueue::new();
        let repository = Arc::new(MemoryAlertRepository::default());
        let email = Arc::new(email);
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(1))
            .with_channel(AlertMethod::Email, email.clone());
        let consumer = AlertConsumer::new(
            queue.clone(),
            repository.clone(),
            Arc::new(dispatcher),
            config,
        );
        Harness {
            queue,
            repository,
            email,
            consumer,
        }
    }

    fn r(id: &str) -> AlertRef {
        AlertRef::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_delivers_gold_cross_email() {
        let h = harness(RecordingChannel::default(), config());
        h.repository.insert(gold_cross("alert-123")).await;
        h.queue.enqueue(&r("alert-123")).await.unwrap();

        let outcome = h.consumer.run_once().await.unwrap();
        assert_eq!(outcome, Some(ProcessOutcome::Delivered));

        let sent = h.email.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "a@b.com");
        assert_eq!(sent[0].1, "Stock Price Crossed");
        assert!(sent[0].2.contains("Gold cross"));
    }

    #[tokio::test]
    async fn test_processes_in_fifo_order() {
        let h = harness(RecordingChannel::default(), config());
        for id in ["A", "B", "C"] {
            let mut context = gold_cross(id);
            context.alert_name = format!("Alert {id}");
            h.repository.insert(context).await;
            h.queue.enqueue(&r(id)).await.unwrap();
        }

        while h.consumer.run_once().await.unwrap().is_some() {}

        let names: Vec<String> = h
            .email
            .sent()
            .await
            .into_iter()
            .map(|(_, _, body)| body.lines().next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Alert Triggered: Alert A",
                "Alert Triggered: Alert B",
                "Alert Triggered: Alert C",
            ]
        );
    }

    #[tokio::test]
    async fn test_deleted_alert_is_skipped_and_next_proceeds() {
        let h = harness(RecordingChannel::default(), config());
        h.repository.insert(gold_cross("alert-123")).await;
        h.queue.enqueue(&r("alert-gone")).await.unwrap();
        h.queue.enqueue(&r("alert-123")).await.unwrap();

        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Skipped(SkipReason::NotFound))
        );
        assert_eq!(h.email.calls(), 0);

        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Delivered)
        );
        assert_eq!(h.email.sent().await.len(), 1);
        assert_eq!(h.queue.attempts(&r("alert-gone")).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_queue_makes_no_calls() {
        let h = harness(RecordingChannel::default(), config());

        assert_eq!(h.consumer.run_once().await.unwrap(), None);
        assert_eq!(h.repository.fetches(), 0);
        assert_eq!(h.email.calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_block_next_alert() {
        let queue = MemoryAlertQueue::new();
        let repository = Arc::new(MemoryAlertRepository::default());
        let email = Arc::new(RecordingChannel::default());
        let messaging = Arc::new(RecordingChannel::failing());
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(1))
            .with_channel(AlertMethod::Email, email.clone())
            .with_channel(AlertMethod::Messaging, messaging.clone());
        let consumer = AlertConsumer::new(
            queue.clone(),
            repository.clone(),
            Arc::new(dispatcher),
            config(),
        );

        let mut broken = gold_cross("A");
        broken.method = AlertMethod::Messaging;
        repository.insert(broken).await;
        repository.insert(gold_cross("B")).await;
        queue.enqueue(&r("A")).await.unwrap();
        queue.enqueue(&r("B")).await.unwrap();

        assert_eq!(
            consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Requeued {
                attempt: 1,
                cause: RetryCause::Delivery
            })
        );
        assert_eq!(
            consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Delivered)
        );
        assert_eq!(messaging.calls(), 1);
        assert_eq!(email.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_retries_then_dead_letters() {
        let h = harness(RecordingChannel::failing(), config());
        h.repository.insert(gold_cross("alert-123")).await;
        h.queue.enqueue(&r("alert-123")).await.unwrap();

        let mut outcomes = Vec::new();
        while let Some(outcome) = h.consumer.run_once().await.unwrap() {
            outcomes.push(outcome);
        }

        assert_eq!(
            outcomes,
            vec![
                ProcessOutcome::Requeued {
                    attempt: 1,
                    cause: RetryCause::Delivery
                },
                ProcessOutcome::Requeued {
                    attempt: 2,
                    cause: RetryCause::Delivery
                },
                ProcessOutcome::GaveUp {
                    cause: RetryCause::Delivery,
                    dead_lettered: true
                },
            ]
        );
        assert_eq!(h.email.calls(), 3);
        assert_eq!(h.queue.dead_letters().await, vec!["alert-123"]);
        assert_eq!(h.queue.attempts(&r("alert-123")).await, 0);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let h = harness(RecordingChannel::failing_times(1), config());
        h.repository.insert(gold_cross("alert-123")).await;
        h.queue.enqueue(&r("alert-123")).await.unwrap();

        assert!(matches!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Requeued { attempt: 1, .. })
        ));
        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Delivered)
        );
        assert_eq!(h.queue.attempts(&r("alert-123")).await, 0);
        assert!(h.queue.dead_letters().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_is_retried() {
        let h = harness(RecordingChannel::default(), config());
        h.repository.insert(gold_cross("alert-123")).await;
        h.repository.unavailable_for(1);
        h.queue.enqueue(&r("alert-123")).await.unwrap();

        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Requeued {
                attempt: 1,
                cause: RetryCause::Repository
            })
        );
        assert_eq!(h.email.calls(), 0);
        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Delivered)
        );
    }

    #[tokio::test]
    async fn test_unsupported_channel_is_dropped_without_retry() {
        let h = harness(RecordingChannel::default(), config());
        let mut context = gold_cross("alert-123");
        context.method = AlertMethod::Sms;
        h.repository.insert(context).await;
        h.queue.enqueue(&r("alert-123")).await.unwrap();

        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Skipped(SkipReason::UnsupportedChannel))
        );
        assert!(h.queue.is_empty().await);
        assert!(h.queue.dead_letters().await.is_empty());
        assert_eq!(h.email.calls(), 0);
    }

    #[tokio::test]
    async fn test_legacy_encodings_are_normalized() {
        let h = harness(RecordingChannel::default(), config());
        h.repository.insert(gold_cross("alert-123")).await;
        for raw in [
            "alert-123",
            "\"alert-123\"",
            "\"\\\"alert-123\\\"\"",
            "{\"id\":\"alert-123\"}",
        ] {
            h.queue.push_raw(raw).await;
        }

        while let Some(outcome) = h.consumer.run_once().await.unwrap() {
            assert_eq!(outcome, ProcessOutcome::Delivered);
        }
        assert_eq!(h.repository.fetches(), 4);
        assert_eq!(h.email.sent().await.len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_dropped() {
        let h = harness(RecordingChannel::default(), config());
        h.queue.push_raw("\"\"").await;

        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Skipped(SkipReason::Malformed))
        );
        assert_eq!(h.repository.fetches(), 0);
    }

    #[tokio::test]
    async fn test_inactive_alerts() {
        let mut inactive = gold_cross("alert-123");
        inactive.is_active = false;

        let h = harness(RecordingChannel::default(), config());
        h.repository.insert(inactive.clone()).await;
        h.queue.enqueue(&r("alert-123")).await.unwrap();
        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Delivered)
        );

        let h = harness(
            RecordingChannel::default(),
            ConsumerConfig {
                skip_inactive: true,
                ..config()
            },
        );
        h.repository.insert(inactive).await;
        h.queue.enqueue(&r("alert-123")).await.unwrap();
        assert_eq!(
            h.consumer.run_once().await.unwrap(),
            Some(ProcessOutcome::Skipped(SkipReason::Inactive))
        );
        assert_eq!(h.email.calls(), 0);
    }

    #[tokio::test]
    async fn test_processor_handles_raw_entry() {
        let h = harness(RecordingChannel::default(), config());
        h.repository.insert(gold_cross("alert-123")).await;

        let outcome = h.consumer.process("\"alert-123\"".to_string()).await;
        assert_eq!(outcome, Ok(ProcessOutcome::Delivered));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let h = harness(RecordingChannel::default(), config());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(h.consumer.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_shuts_down_during_backoff() {
        let h = harness(
            RecordingChannel::default(),
            ConsumerConfig {
                backoff_base: Duration::from_secs(60),
                backoff_max: Duration::from_secs(60),
                ..config()
            },
        );
        h.repository.insert(gold_cross("alert-123")).await;
        h.repository.unavailable_for(usize::MAX);
        h.queue.enqueue(&r("alert-123")).await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(h.consumer.run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.repository.fetches(), 1);
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(h.repository.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_relay_outage_does_not_exhaust_retries() {
        let h = harness(
            RecordingChannel::failing_times(3),
            ConsumerConfig {
                max_retries: 3,
                backoff_base: Duration::from_millis(500),
                backoff_max: Duration::from_secs(30),
                ..config()
            },
        );
        h.repository.insert(gold_cross("alert-123")).await;
        h.queue.enqueue(&r("alert-123")).await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(h.consumer.run(shutdown_rx));

        // Retries are spaced by the backoff, not fired back to back.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.email.calls(), 1);
        assert_eq!(h.queue.attempts(&r("alert-123")).await, 1);

        // 500ms + 1s + 2s of backoff covers the outage.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.email.calls(), 4);
        assert_eq!(h.email.sent().await.len(), 1);
        assert!(h.queue.dead_letters().await.is_empty());
        assert_eq!(h.queue.attempts(&r("alert-123")).await, 0);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumers_deliver_each_entry_once() {
        let queue = MemoryAlertQueue::new();
        let repository = Arc::new(MemoryAlertRepository::default());
        let email = Arc::new(RecordingChannel::default());
        let dispatcher = Arc::new(
            NotificationDispatcher::new(Duration::from_secs(1))
                .with_channel(AlertMethod::Email, email.clone()),
        );

        for i in 0..40 {
            let id = format!("alert-{i}");
            let mut context = gold_cross(&id);
            context.alert_name = id.clone();
            repository.insert(context).await;
            queue.enqueue(&r(&id)).await.unwrap();
        }

        let mut handles = Vec::new();
        for worker in 0..4 {
            let consumer = AlertConsumer::new(
                queue.clone(),
                repository.clone(),
                dispatcher.clone(),
                config(),
            )
            .with_worker_id(worker);
            handles.push(tokio::spawn(async move {
                while consumer.run_once().await.unwrap().is_some() {}
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let sent = email.sent().await;
        assert_eq!(sent.len(), 40);
        let unique: HashSet<String> = sent.into_iter().map(|(_, _, body)| body).collect();
        assert_eq!(unique.len(), 40);
    }
}
