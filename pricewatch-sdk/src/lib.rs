//! Shared contract between the price alert API (producer) and the
//! notification worker (consumer).
//!
//! The queue carries nothing but alert identifiers. This crate fixes how
//! those identifiers are encoded, how legacy encodings are normalized, and
//! how the queue keys are named.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

#[cfg(feature = "producer")]
pub mod client;
pub mod objects;
pub mod queue;

pub use objects::{AlertMethod, AlertRef, AlertRefError, ConditionType};
