//! Notification dispatch.
//!
//! The dispatcher owns one channel per [`AlertMethod`]. A method without a
//! wired transport is backed by [`UnimplementedChannel`], which fails with
//! [`DeliveryError::UnsupportedChannel`] instead of silently doing nothing.

mod email;
mod messaging;
mod render;

pub use email::EmailChannel;
pub use messaging::MessagingChannel;
pub use render::{SUBJECT, render_body};

use crate::entities::{AlertContext, Recipient};
use async_trait::async_trait;
use pricewatch_sdk::AlertMethod;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No transport is wired for this method. Never retried.
    #[error("{0} notifications are not implemented")]
    UnsupportedChannel(AlertMethod),

    /// The recipient cannot be addressed on this channel. Never retried.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The transport call failed or timed out. Retryable.
    #[error("transport error: {cause}")]
    Transport { cause: String },
}

impl DeliveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Transport { .. })
    }
}

/// Errors raised while building a channel from configuration.
#[derive(Debug, Error)]
pub enum ChannelSetupError {
    #[error("invalid sender address {address:?}: {reason}")]
    InvalidSender { address: String, reason: String },

    #[error("failed to build transport: {0}")]
    Transport(String),
}

/// A delivery mechanism able to send one message to one recipient.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(
        &self,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError>;
}

/// Placeholder for a channel that has no transport yet.
#[derive(Debug, Clone, Copy)]
pub struct UnimplementedChannel {
    method: AlertMethod,
}

impl UnimplementedChannel {
    pub fn new(method: AlertMethod) -> Self {
        Self { method }
    }
}

#[async_trait]
impl NotificationChannel for UnimplementedChannel {
    async fn send(&self, _: &Recipient, _: &str, _: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::UnsupportedChannel(self.method))
    }
}

/// SMS delivery. No carrier integration exists yet.
pub type SmsChannel = UnimplementedChannel;

/// Push delivery. No device registry exists yet.
pub type PushChannel = UnimplementedChannel;

/// A rendered notification, ready to hand to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub context: AlertContext,
    pub subject: &'static str,
    pub body: String,
    pub channel: AlertMethod,
}

impl NotificationJob {
    pub fn new(context: AlertContext) -> Self {
        let body = render_body(&context);
        let channel = context.method;
        Self {
            context,
            subject: SUBJECT,
            body,
            channel,
        }
    }
}

/// Routes rendered notifications to the channel named by the alert.
pub struct NotificationDispatcher {
    email: Arc<dyn NotificationChannel>,
    sms: Arc<dyn NotificationChannel>,
    push: Arc<dyn NotificationChannel>,
    messaging: Arc<dyn NotificationChannel>,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    /// A dispatcher with every channel unimplemented.
    ///
    /// * `send_timeout` - upper bound for a single transport call
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            email: Arc::new(UnimplementedChannel::new(AlertMethod::Email)),
            sms: Arc::new(SmsChannel::new(AlertMethod::Sms)),
            push: Arc::new(PushChannel::new(AlertMethod::Push)),
            messaging: Arc::new(UnimplementedChannel::new(AlertMethod::Messaging)),
            send_timeout,
        }
    }

    /// Wire a transport for `method`.
    pub fn with_channel(
        mut self,
        method: AlertMethod,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        match method {
            AlertMethod::Email => self.email = channel,
            AlertMethod::Sms => self.sms = channel,
            AlertMethod::Push => self.push = channel,
            AlertMethod::Messaging => self.messaging = channel,
        }
        self
    }

    fn channel(&self, method: AlertMethod) -> &dyn NotificationChannel {
        match method {
            AlertMethod::Email => self.email.as_ref(),
            AlertMethod::Sms => self.sms.as_ref(),
            AlertMethod::Push => self.push.as_ref(),
            AlertMethod::Messaging => self.messaging.as_ref(),
        }
    }

    /// Render and deliver a notification for `context`.
    pub async fn dispatch(&self, context: &AlertContext) -> Result<(), DeliveryError> {
        self.deliver(&NotificationJob::new(context.clone())).await
    }

    /// Deliver an already rendered job with exactly one transport call.
    pub async fn deliver(&self, job: &NotificationJob) -> Result<(), DeliveryError> {
        let channel = self.channel(job.channel);
        debug!(
            alert_ref = %job.context.alert_ref,
            channel = %job.channel,
            "Dispatching notification"
        );

        match tokio::time::timeout(
            self.send_timeout,
            channel.send(&job.context.recipient, job.subject, &job.body),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Transport {
                cause: format!("send timed out after {:?}", self.send_timeout),
            }),
        }
    }
}
