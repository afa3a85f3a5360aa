//! Chat-bot messaging configuration.

use url::Url;

/// Telegram Bot API credentials for the messaging channel.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub bot_token: String,
    /// API root, `https://api.telegram.org` unless self-hosted.
    pub api_base: Url,
}
