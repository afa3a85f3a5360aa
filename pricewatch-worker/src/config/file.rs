//! TOML file configuration structures.
//!
//! These structs directly map to the `pricewatch.toml` file format.

use pricewatch_core::config::SmtpSecurity;
use pricewatch_sdk::queue::DEFAULT_ALERT_QUEUE;
use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub queue: QueueSection,
    #[serde(default)]
    pub consumer: ConsumerSection,
    pub email: EmailSection,
    /// Absent section: messaging alerts are reported as unsupported.
    #[serde(default)]
    pub messaging: Option<MessagingSection>,
}

/// Queue configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSection {
    pub redis_url: Url,
    #[serde(default = "default_queue_name")]
    pub name: String,
    /// Defaults to `<name>:failed`.
    #[serde(default)]
    pub dead_letter: Option<String>,
    #[serde(default = "default_true")]
    pub dead_letter_enabled: bool,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

fn default_queue_name() -> String {
    DEFAULT_ALERT_QUEUE.to_owned()
}

fn default_true() -> bool {
    true
}

fn default_op_timeout_ms() -> u64 {
    5_000
}

/// Consumer configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSection {
    /// Number of consumers to spawn.
    pub workers: usize,
    pub poll_timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub skip_inactive: bool,
}

impl Default for ConsumerSection {
    fn default() -> Self {
        Self {
            workers: 1,
            poll_timeout_ms: 1_000,
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            skip_inactive: false,
        }
    }
}

/// SMTP configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSection {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub security: SmtpSecurity,
    #[serde(default)]
    pub username: Option<String>,
    /// Prefer the `SMTP_PASSWORD` environment variable.
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_send_timeout_ms() -> u64 {
    15_000
}

/// Telegram bot configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingSection {
    /// Prefer the `MESSAGING_BOT_TOKEN` environment variable.
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: Url,
}

fn default_api_base() -> Url {
    Url::parse("https://api.telegram.org").expect("valid default API base")
}
