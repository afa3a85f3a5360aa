//! Configuration module for pricewatch-worker.
//!
//! Handles loading configuration from the TOML file, CLI arguments,
//! and environment variables, and converts it into the runtime types
//! used by `pricewatch-core`.

pub mod file;

use crate::config::file::{ConsumerSection, EmailSection, FileConfig, MessagingSection, QueueSection};
use pricewatch_core::config::{ConsumerConfig, MessagingConfig, QueueConfig, SmtpConfig};
use pricewatch_sdk::queue::dead_letter_key;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Overrides `email.password`.
pub const SMTP_PASSWORD_ENV: &str = "SMTP_PASSWORD";
/// Overrides `messaging.bot_token`.
pub const MESSAGING_BOT_TOKEN_ENV: &str = "MESSAGING_BOT_TOKEN";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub queue: QueueConfig,
    pub consumer: ConsumerConfig,
    pub workers: usize,
    pub smtp: SmtpConfig,
    pub messaging: Option<MessagingConfig>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    workers_override: Option<usize>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, workers_override: Option<usize>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            workers_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    /// 4. Build the runtime configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content, |key| std::env::var(key).ok())
    }

    fn load_str(
        &self,
        content: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(workers) = self.workers_override {
            file_config.consumer.workers = workers;
        }
        if let Some(password) = env(SMTP_PASSWORD_ENV) {
            file_config.email.password = Some(password);
        }
        if let (Some(messaging), Some(token)) =
            (file_config.messaging.as_mut(), env(MESSAGING_BOT_TOKEN_ENV))
        {
            messaging.bot_token = Some(token);
        }

        validate(&file_config)?;
        build_loaded_config(file_config)
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    match config.queue.redis_url.scheme() {
        "redis" | "rediss" => {}
        other => {
            return Err(ConfigError::Validation(format!(
                "queue.redis_url must use redis:// or rediss://, got {other}://"
            )));
        }
    }
    if config.queue.name.trim().is_empty() {
        return Err(ConfigError::Validation("queue.name is empty".to_string()));
    }
    if config.queue.op_timeout_ms == 0 {
        return Err(ConfigError::Validation("queue.op_timeout_ms must be positive".to_string()));
    }

    let consumer = &config.consumer;
    if consumer.workers == 0 {
        return Err(ConfigError::Validation("consumer.workers must be at least 1".to_string()));
    }
    if consumer.poll_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "consumer.poll_timeout_ms must be positive".to_string(),
        ));
    }
    if consumer.backoff_base_ms > consumer.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "consumer.backoff_base_ms ({}) exceeds consumer.backoff_max_ms ({})",
            consumer.backoff_base_ms, consumer.backoff_max_ms
        )));
    }

    if let Err(e) = config.email.from.parse::<lettre::message::Mailbox>() {
        return Err(ConfigError::Validation(format!(
            "email.from {:?} is not a valid mailbox: {e}",
            config.email.from
        )));
    }
    if config.email.send_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "email.send_timeout_ms must be positive".to_string(),
        ));
    }

    if let Some(messaging) = &config.messaging {
        let missing = messaging
            .bot_token
            .as_deref()
            .is_none_or(|token| token.trim().is_empty());
        if missing {
            return Err(ConfigError::Validation(format!(
                "messaging.bot_token is required (or set {MESSAGING_BOT_TOKEN_ENV})"
            )));
        }
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let workers = file_config.consumer.workers;
    let messaging = file_config
        .messaging
        .map(convert_messaging)
        .transpose()?;

    Ok(LoadedConfig {
        queue: convert_queue(file_config.queue),
        consumer: convert_consumer(&file_config.consumer),
        workers,
        smtp: convert_email(file_config.email),
        messaging,
    })
}

fn convert_queue(q: QueueSection) -> QueueConfig {
    let dead_letter = q
        .dead_letter_enabled
        .then(|| q.dead_letter.unwrap_or_else(|| dead_letter_key(&q.name)));
    QueueConfig {
        redis_url: q.redis_url,
        name: q.name,
        dead_letter,
        op_timeout: Duration::from_millis(q.op_timeout_ms),
    }
}

fn convert_consumer(c: &ConsumerSection) -> ConsumerConfig {
    ConsumerConfig {
        poll_timeout: Duration::from_millis(c.poll_timeout_ms),
        max_retries: c.max_retries,
        backoff_base: Duration::from_millis(c.backoff_base_ms),
        backoff_max: Duration::from_millis(c.backoff_max_ms),
        skip_inactive: c.skip_inactive,
    }
}

fn convert_email(e: EmailSection) -> SmtpConfig {
    SmtpConfig {
        host: e.host,
        port: e.port,
        security: e.security,
        username: e.username,
        password: e.password,
        from: e.from,
        send_timeout: Duration::from_millis(e.send_timeout_ms),
    }
}

fn convert_messaging(m: MessagingSection) -> Result<MessagingConfig, ConfigError> {
    let bot_token = m
        .bot_token
        .ok_or_else(|| ConfigError::Validation("messaging.bot_token is required".to_string()))?;
    Ok(MessagingConfig {
        bot_token,
        api_base: m.api_base,
    })
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
