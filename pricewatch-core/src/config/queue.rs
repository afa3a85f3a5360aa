//! Queue connection configuration.

use pricewatch_sdk::queue::{DEFAULT_ALERT_QUEUE, dead_letter_key};
use std::time::Duration;
use url::Url;

/// Where the alert queue lives and how it is named.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis connection URL (`redis://` or `rediss://`).
    pub redis_url: Url,
    /// Name of the list carrying alert references.
    pub name: String,
    /// List receiving references that exhausted their retries.
    /// `None` disables dead-lettering.
    pub dead_letter: Option<String>,
    /// Upper bound for non-blocking queue commands.
    pub op_timeout: Duration,
}

impl QueueConfig {
    /// Default queue names on the given Redis instance.
    pub fn new(redis_url: Url) -> Self {
        Self {
            redis_url,
            name: DEFAULT_ALERT_QUEUE.to_owned(),
            dead_letter: Some(dead_letter_key(DEFAULT_ALERT_QUEUE)),
            op_timeout: Duration::from_secs(5),
        }
    }
}
