//! Producer-side queue client.
//!
//! Gated behind the `producer` cargo feature so crates that only need the
//! shared types do not pull in `redis`.

mod producer;

pub use producer::AlertProducer;

/// Errors produced by the producer client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The Redis URL could not be parsed or the connection failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The push did not complete within the configured timeout.
    #[error("queue operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
