//! Read-only access to alert context.
//!
//! The consumer never trusts anything but the identifier it dequeued; the
//! repository is where the authoritative state comes from.

use crate::entities::{AlertContext, FetchAlertContext};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use pricewatch_sdk::AlertRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The alert was deleted after it was enqueued. Never retried.
    #[error("alert {0} not found")]
    NotFound(AlertRef),

    /// The store could not be reached. Retryable.
    #[error("alert store unavailable: {0}")]
    Unavailable(String),

    /// The row exists but cannot be interpreted. Never retried.
    #[error("alert {alert_ref} has an invalid record: {reason}")]
    InvalidRecord { alert_ref: AlertRef, reason: String },
}

impl RepositoryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }

    fn from_sqlx(alert_ref: &AlertRef, error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => RepositoryError::NotFound(alert_ref.clone()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => RepositoryError::InvalidRecord {
                alert_ref: alert_ref.clone(),
                reason: error.to_string(),
            },
            other => RepositoryError::Unavailable(other.to_string()),
        }
    }
}

/// Point lookup of an alert's full context.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn fetch(&self, alert_ref: &AlertRef) -> Result<AlertContext, RepositoryError>;
}

#[async_trait]
impl AlertRepository for DatabaseProcessor {
    async fn fetch(&self, alert_ref: &AlertRef) -> Result<AlertContext, RepositoryError> {
        let row = self
            .process(FetchAlertContext {
                alert_ref: alert_ref.clone(),
            })
            .await
            .map_err(|e| RepositoryError::from_sqlx(alert_ref, e))?
            .ok_or_else(|| RepositoryError::NotFound(alert_ref.clone()))?;

        row.into_context(alert_ref.clone())
            .map_err(|reason| RepositoryError::InvalidRecord {
                alert_ref: alert_ref.clone(),
                reason,
            })
    }
}

#[async_trait]
impl<T: AlertRepository + ?Sized> AlertRepository for std::sync::Arc<T> {
    async fn fetch(&self, alert_ref: &AlertRef) -> Result<AlertContext, RepositoryError> {
        (**self).fetch(alert_ref).await
    }
}
