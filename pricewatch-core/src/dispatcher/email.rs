//! Email channel over SMTP.

use super::{ChannelSetupError, DeliveryError, NotificationChannel};
use crate::config::{SmtpConfig, SmtpSecurity};
use crate::entities::Recipient;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Sends plain-text alert emails through an SMTP relay.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    /// Build the transport. No connection is opened until the first send.
    pub fn new(config: &SmtpConfig) -> Result<Self, ChannelSetupError> {
        let from: Mailbox =
            config
                .from
                .parse()
                .map_err(|e: lettre::address::AddressError| ChannelSetupError::InvalidSender {
                    address: config.from.clone(),
                    reason: e.to_string(),
                })?;

        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| ChannelSetupError::Transport(e.to_string()))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| ChannelSetupError::Transport(e.to_string()))?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        info!(
            host = %config.host,
            port = config.port,
            security = ?config.security,
            "Email channel configured"
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(
        &self,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> Result<Message, DeliveryError> {
        let to: Mailbox = recipient.email.trim().parse().map_err(
            |e: lettre::address::AddressError| {
                DeliveryError::InvalidRecipient(format!("{:?}: {e}", recipient.email))
            },
        )?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
            .map_err(|e| DeliveryError::InvalidRecipient(e.to_string()))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(
        &self,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        let message = self.build_message(recipient, subject, body)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport {
                cause: e.to_string(),
            })?;

        info!(
            code = %response.code(),
            "Email accepted by relay"
        );
        Ok(())
    }
}
