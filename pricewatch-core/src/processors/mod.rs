//! Long-running processors.
//!
//! - `AlertConsumer`: pops alert references, emits notifications

pub mod alert_consumer;

pub use alert_consumer::{AlertConsumer, ProcessOutcome, RetryCause, SkipReason};
