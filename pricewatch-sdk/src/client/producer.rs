//! Alert producer (web API → notification queue).

use redis::aio::ConnectionManager;
use redis::{Client, Cmd};
use std::time::Duration;

use super::ClientError;
use crate::objects::AlertRef;
use crate::queue::{DEFAULT_ALERT_QUEUE, PUSH_COMMAND};

/// Pushes alert references onto the notification queue.
///
/// The API layer calls [`enqueue`](AlertProducer::enqueue) after every
/// alert create or update. Only the bare identifier is pushed; the consumer
/// re-reads everything else from the database.
#[derive(Clone)]
pub struct AlertProducer {
    conn: ConnectionManager,
    queue: String,
    timeout: Duration,
}

impl AlertProducer {
    /// Connect to Redis and target the default queue.
    ///
    /// * `redis_url` – e.g. `redis://127.0.0.1:6379`.
    pub async fn connect(redis_url: &str) -> Result<Self, ClientError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            queue: DEFAULT_ALERT_QUEUE.to_owned(),
            timeout: Duration::from_secs(5),
        })
    }

    /// Target a differently named queue.
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Bound every push by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Append `alert_ref` to the tail of the queue.
    pub async fn enqueue(&self, alert_ref: &AlertRef) -> Result<(), ClientError> {
        let mut conn = self.conn.clone();
        let cmd = push_cmd(&self.queue, alert_ref);
        tokio::time::timeout(self.timeout, cmd.query_async::<_, ()>(&mut conn))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;
        Ok(())
    }
}

fn push_cmd(queue: &str, alert_ref: &AlertRef) -> Cmd {
    redis::cmd(PUSH_COMMAND)
        .arg(queue)
        .arg(alert_ref.encode())
        .to_owned()
}
