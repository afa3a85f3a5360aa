#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatcher;
pub mod entities;
pub mod framework;
pub mod processors;
pub mod queue;
pub mod repository;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
