//! Redis-backed alert queue.

use super::{AlertQueue, QueueError};
use crate::config::QueueConfig;
use async_trait::async_trait;
use pricewatch_sdk::AlertRef;
use pricewatch_sdk::queue::{POP_COMMAND, PUSH_COMMAND, attempts_key};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Cmd};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Extra time granted to a blocking pop on top of its own server-side
/// timeout before the connection is considered hung.
const BLOCKING_GRACE: Duration = Duration::from_secs(5);

/// Alert queue stored in a Redis list.
///
/// Each consumer should own its own instance: a blocking pop occupies the
/// underlying connection until it returns.
#[derive(Clone)]
pub struct RedisAlertQueue {
    conn: ConnectionManager,
    queue_key: String,
    attempts_key: String,
    dead_letter_key: Option<String>,
    op_timeout: Duration,
}

impl RedisAlertQueue {
    /// Open a dedicated connection for one consumer.
    pub async fn connect(config: &QueueConfig) -> Result<Self, QueueError> {
        let client = Client::open(config.redis_url.as_str())?;
        let conn = tokio::time::timeout(config.op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                QueueError::Unavailable(format!(
                    "connecting to redis timed out after {:?}",
                    config.op_timeout
                ))
            })??;

        debug!(queue = %config.name, "Connected to alert queue");

        Ok(Self {
            conn,
            queue_key: config.name.clone(),
            attempts_key: attempts_key(&config.name),
            dead_letter_key: config.dead_letter.clone(),
            op_timeout: config.op_timeout,
        })
    }

    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    /// Number of references waiting in the main queue.
    pub async fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        self.bounded(self.op_timeout, conn.llen(&self.queue_key)).await
    }

    /// Number of references parked in the dead-letter list.
    pub async fn dead_letter_len(&self) -> Result<usize, QueueError> {
        let Some(dead_letter_key) = &self.dead_letter_key else {
            return Ok(0);
        };
        let mut conn = self.conn.clone();
        self.bounded(self.op_timeout, conn.llen(dead_letter_key)).await
    }

    /// Move every dead-lettered reference back to the tail of the main queue.
    ///
    /// Each move is a single `LMOVE`, so a reference is never in both lists
    /// or in neither. Returns how many references were moved.
    pub async fn redrive_dead_letters(&self) -> Result<usize, QueueError> {
        let Some(dead_letter_key) = &self.dead_letter_key else {
            return Ok(0);
        };

        let mut moved = 0;
        loop {
            let mut conn = self.conn.clone();
            let cmd = redrive_cmd(dead_letter_key, &self.queue_key);
            let entry: Option<String> = self
                .bounded(self.op_timeout, cmd.query_async(&mut conn))
                .await?;
            match entry {
                Some(_) => moved += 1,
                None => break,
            }
        }
        // Retries start over for redriven references.
        if moved > 0 {
            let mut conn = self.conn.clone();
            self.bounded(self.op_timeout, conn.del::<_, ()>(&self.attempts_key))
                .await?;
        }
        Ok(moved)
    }

    async fn bounded<T, F>(&self, limit: Duration, fut: F) -> Result<T, QueueError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(QueueError::Unavailable(format!(
                "redis did not answer within {limit:?}"
            ))),
        }
    }
}

#[async_trait]
impl AlertQueue for RedisAlertQueue {
    async fn enqueue(&self, alert_ref: &AlertRef) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let cmd = push_cmd(&self.queue_key, alert_ref);
        self.bounded(self.op_timeout, cmd.query_async::<_, ()>(&mut conn))
            .await
    }

    async fn dequeue_blocking(&self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        let cmd = pop_cmd(&self.queue_key, timeout);
        let popped: Option<(String, String)> = self
            .bounded(timeout + BLOCKING_GRACE, cmd.query_async(&mut conn))
            .await?;
        Ok(popped.map(|(_key, entry)| entry))
    }

    async fn record_attempt(&self, alert_ref: &AlertRef) -> Result<u32, QueueError> {
        let mut conn = self.conn.clone();
        let attempts: i64 = self
            .bounded(
                self.op_timeout,
                conn.hincr(&self.attempts_key, alert_ref.as_str(), 1),
            )
            .await?;
        Ok(u32::try_from(attempts).unwrap_or(u32::MAX))
    }

    async fn clear_attempts(&self, alert_ref: &AlertRef) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        self.bounded(
            self.op_timeout,
            conn.hdel::<_, _, ()>(&self.attempts_key, alert_ref.as_str()),
        )
        .await
    }

    async fn dead_letter(&self, alert_ref: &AlertRef) -> Result<bool, QueueError> {
        let Some(dead_letter_key) = &self.dead_letter_key else {
            return Ok(false);
        };
        let mut conn = self.conn.clone();
        let cmd = push_cmd(dead_letter_key, alert_ref);
        self.bounded(self.op_timeout, cmd.query_async::<_, ()>(&mut conn))
            .await?;
        Ok(true)
    }
}

/// Append to the tail (left end) of `key`, as the web application does.
fn push_cmd(key: &str, alert_ref: &AlertRef) -> Cmd {
    redis::cmd(PUSH_COMMAND)
        .arg(key)
        .arg(alert_ref.encode())
        .to_owned()
}

/// Pop the oldest entry (right end) of `key`, waiting up to `timeout`.
fn pop_cmd(key: &str, timeout: Duration) -> Cmd {
    redis::cmd(POP_COMMAND)
        .arg(key)
        .arg(pop_timeout_secs(timeout))
        .to_owned()
}

/// Server-side wait in fractional seconds. 0 would mean "block forever".
fn pop_timeout_secs(timeout: Duration) -> f64 {
    timeout.as_secs_f64().max(0.001)
}

/// Move the oldest dead letter to the tail of the main queue.
fn redrive_cmd(dead_letter_key: &str, queue_key: &str) -> Cmd {
    redis::cmd("LMOVE")
        .arg(dead_letter_key)
        .arg(queue_key)
        .arg("RIGHT")
        .arg("LEFT")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::Value;

    fn packed(cmd: &Cmd) -> String {
        String::from_utf8(cmd.get_packed_command()).unwrap()
    }

    #[test]
    fn test_push_goes_to_left_end() {
        let alert_ref = AlertRef::new("A").unwrap();
        assert_eq!(
            packed(&push_cmd("AlertQueue", &alert_ref)),
            "*3\r\n$5\r\nLPUSH\r\n$10\r\nAlertQueue\r\n$1\r\nA\r\n"
        );
    }

    #[test]
    fn test_pop_takes_right_end() {
        let cmd = pop_cmd("AlertQueue", Duration::from_secs(1));
        assert!(packed(&cmd).starts_with("*3\r\n$5\r\nBRPOP\r\n$10\r\nAlertQueue\r\n"));
    }

    #[test]
    fn test_pop_timeout_never_blocks_forever() {
        assert_eq!(pop_timeout_secs(Duration::ZERO), 0.001);
        assert_eq!(pop_timeout_secs(Duration::from_millis(1500)), 1.5);
    }

    #[test]
    fn test_redrive_moves_oldest_to_tail() {
        assert_eq!(
            packed(&redrive_cmd("AlertQueue:failed", "AlertQueue")),
            "*5\r\n$5\r\nLMOVE\r\n$17\r\nAlertQueue:failed\r\n$10\r\nAlertQueue\r\n\
             $5\r\nRIGHT\r\n$4\r\nLEFT\r\n"
        );
    }

    #[test]
    fn test_pop_reply_decoding() {
        let timed_out: Option<(String, String)> = redis::from_redis_value(&Value::Nil).unwrap();
        assert_eq!(timed_out, None);

        let reply = Value::Bulk(vec![
            Value::Data(b"AlertQueue".to_vec()),
            Value::Data(b"alert-123".to_vec()),
        ]);
        let popped: Option<(String, String)> = redis::from_redis_value(&reply).unwrap();
        assert_eq!(popped.map(|(_key, entry)| entry).as_deref(), Some("alert-123"));
    }

    /// Replays the list commands on a local deque to check the end pairing.
    #[test]
    fn test_web_producer_entries_come_out_in_order() {
        let mut list = std::collections::VecDeque::new();
        for id in ["A", "B", "C"] {
            match PUSH_COMMAND {
                "LPUSH" => list.push_front(id),
                _ => list.push_back(id),
            }
        }
        let mut popped = Vec::new();
        while let Some(id) = match POP_COMMAND {
            "BRPOP" => list.pop_back(),
            _ => list.pop_front(),
        } {
            popped.push(id);
        }
        assert_eq!(popped, vec!["A", "B", "C"]);
    }
}
