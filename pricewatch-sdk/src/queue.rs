//! Queue key naming and list direction shared by producers and consumers.
//!
//! The web application pushes with `LPUSH`, so the left end of the list is
//! its tail. Consumers pop the oldest entry from the right end.

/// Name of the list the web application pushes alert references onto.
pub const DEFAULT_ALERT_QUEUE: &str = "AlertQueue";

/// Command that appends a reference to the tail of a queue list.
pub const PUSH_COMMAND: &str = "LPUSH";

/// Blocking command that removes the oldest reference from a queue list.
pub const POP_COMMAND: &str = "BRPOP";

/// Hash holding the failed-attempt count per reference.
pub fn attempts_key(queue: &str) -> String {
    format!("{queue}:attempts")
}

/// List receiving references that exhausted their retries.
pub fn dead_letter_key(queue: &str) -> String {
    format!("{queue}:failed")
}
