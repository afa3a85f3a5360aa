//! Fakes and fixtures shared by the unit tests.

use crate::dispatcher::{DeliveryError, NotificationChannel};
use crate::entities::{AlertContext, AssetInfo, Recipient};
use crate::repository::{AlertRepository, RepositoryError};
use async_trait::async_trait;
use pricewatch_sdk::{AlertMethod, AlertRef, ConditionType};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// The "Gold cross" email alert owned by `a@b.com`.
pub fn gold_cross(id: &str) -> AlertContext {
    AlertContext {
        alert_ref: AlertRef::new(id).unwrap(),
        alert_name: "Gold cross".to_string(),
        condition: ConditionType::Above,
        target_value: Decimal::new(20000, 1),
        method: AlertMethod::Email,
        is_active: true,
        asset: AssetInfo {
            symbol: "GOLD".to_string(),
            name: "Gold Spot".to_string(),
            kind: "COMMODITY".to_string(),
        },
        recipient: Recipient {
            email: "a@b.com".to_string(),
            messaging_handle: None,
        },
    }
}

/// Channel that records every successful send.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, String, String)>>,
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    stall: bool,
}

impl RecordingChannel {
    /// Every send fails with a transport error.
    pub fn failing() -> Self {
        Self::failing_times(usize::MAX)
    }

    /// The first `n` sends fail with a transport error.
    pub fn failing_times(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    /// Every send hangs for an hour.
    pub fn stalled() -> Self {
        Self {
            stall: true,
            ..Self::default()
        }
    }

    /// `(recipient email, subject, body)` of each successful send.
    pub async fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().await.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(
        &self,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DeliveryError::Transport {
                cause: "relay rejected the message".to_string(),
            });
        }
        self.sent.lock().await.push((
            recipient.email.clone(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

/// Alert store kept in a map.
#[derive(Default)]
pub struct MemoryAlertRepository {
    alerts: Mutex<HashMap<String, AlertContext>>,
    unavailable_left: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemoryAlertRepository {
    pub async fn insert(&self, context: AlertContext) {
        self.alerts
            .lock()
            .await
            .insert(context.alert_ref.as_str().to_string(), context);
    }

    /// The next `n` fetches fail as if the database were down.
    pub fn unavailable_for(&self, n: usize) {
        self.unavailable_left.store(n, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn fetch(&self, alert_ref: &AlertRef) -> Result<AlertContext, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let down = self
            .unavailable_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if down {
            return Err(RepositoryError::Unavailable("connection refused".to_string()));
        }
        self.alerts
            .lock()
            .await
            .get(alert_ref.as_str())
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(alert_ref.clone()))
    }
}
