//! Queue reference to an alert row.
//!
//! On the wire a reference is the bare alert identifier: no JSON, no quotes.
//! Producers built before this contract pushed JSON-encoded strings or the
//! whole serialized alert row, so [`AlertRef::normalize`] accepts those too.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of JSON string layers unwrapped by [`AlertRef::normalize`].
const MAX_DECODE_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertRefError {
    #[error("alert reference is empty")]
    Empty,
    #[error("alert reference contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Opaque identifier of an alert, as carried on the notification queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlertRef(CompactString);

impl AlertRef {
    /// Build a reference from an identifier in canonical form.
    pub fn new(id: impl AsRef<str>) -> Result<Self, AlertRefError> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(AlertRefError::Empty);
        }
        if let Some(c) = id
            .chars()
            .find(|c| *c == '"' || *c == '\\' || c.is_whitespace() || c.is_control())
        {
            return Err(AlertRefError::InvalidCharacter(c));
        }
        Ok(Self(CompactString::from(id)))
    }

    /// Recover a reference from a raw queue entry.
    ///
    /// Accepts, in order:
    /// - a plain identifier
    /// - one or more layers of JSON string encoding (`"\"abc\""`)
    /// - a JSON object with an `id` field (string or number)
    /// - anything else, with stray backslashes and quotes removed
    pub fn normalize(raw: &str) -> Result<Self, AlertRefError> {
        let mut current = raw.trim().to_owned();

        for _ in 0..MAX_DECODE_DEPTH {
            if current.starts_with('"') {
                match serde_json::from_str::<String>(&current) {
                    Ok(inner) => {
                        current = inner.trim().to_owned();
                        continue;
                    }
                    Err(_) => break,
                }
            }
            if current.starts_with('{') {
                if let Some(id) = id_from_object(&current) {
                    current = id;
                }
            }
            break;
        }

        current.retain(|c| c != '\\' && c != '"');
        Self::new(current.trim())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The wire form pushed onto the queue.
    pub fn encode(&self) -> &str {
        self.as_str()
    }
}

fn id_from_object(json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    match value.get("id")? {
        serde_json::Value::String(s) => Some(s.trim().to_owned()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl fmt::Display for AlertRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AlertRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AlertRef {
    type Error = AlertRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AlertRef> for String {
    fn from(value: AlertRef) -> Self {
        value.0.into()
    }
}
