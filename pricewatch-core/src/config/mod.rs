//! Runtime configuration types for the notification pipeline.
//!
//! These types hold validated values. Reading and validating the TOML file
//! is handled by the worker crate.

mod consumer;
mod messaging;
mod queue;
mod smtp;

pub use consumer::ConsumerConfig;
pub use messaging::MessagingConfig;
pub use queue::QueueConfig;
pub use smtp::{SmtpConfig, SmtpSecurity};
