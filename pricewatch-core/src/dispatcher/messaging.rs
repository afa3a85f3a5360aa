//! Messaging channel over the Telegram Bot API.

use super::{ChannelSetupError, DeliveryError, NotificationChannel};
use crate::config::MessagingConfig;
use crate::entities::Recipient;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use url::Url;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

/// Sends alert messages to the user's linked chat.
pub struct MessagingChannel {
    http_client: reqwest::Client,
    send_url: Url,
}

impl MessagingChannel {
    pub fn new(config: &MessagingConfig) -> Result<Self, ChannelSetupError> {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Use a preconfigured `reqwest::Client` (timeouts, proxy).
    pub fn with_client(
        config: &MessagingConfig,
        http_client: reqwest::Client,
    ) -> Result<Self, ChannelSetupError> {
        // Join resolves against the last path segment only when the base
        // ends in '/'.
        let mut api_base = config.api_base.clone();
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        let send_url = api_base
            // Leading "./" keeps the token's ':' from parsing as a scheme.
            .join(&format!("./bot{}/sendMessage", config.bot_token))
            .map_err(|e| ChannelSetupError::Transport(e.to_string()))?;
        Ok(Self {
            http_client,
            send_url,
        })
    }
}

#[async_trait]
impl NotificationChannel for MessagingChannel {
    async fn send(
        &self,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        let chat_id = recipient.messaging_handle.as_deref().ok_or_else(|| {
            DeliveryError::InvalidRecipient("recipient has no messaging handle".to_string())
        })?;

        let payload = SendMessage {
            chat_id,
            text: format!("{subject}\n\n{body}"),
        };

        let response = self
            .http_client
            .post(self.send_url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                // Without the URL: it embeds the bot token.
                cause: e.without_url().to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            info!("Message accepted by bot API");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::FORBIDDEN {
            // Unknown chat or the user blocked the bot: retrying cannot help.
            return Err(DeliveryError::InvalidRecipient(format!(
                "bot API rejected chat {chat_id} with status {status}: {body}"
            )));
        }
        Err(DeliveryError::Transport {
            cause: format!("bot API responded with status {status}: {body}"),
        })
    }
}
