//! SMTP transport configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (usually port 587).
    #[default]
    StartTls,
    /// Implicit TLS (usually port 465).
    Tls,
    /// No encryption. Only for local relays and test mail catchers.
    None,
}

/// SMTP submission settings for the email channel.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender mailbox, e.g. `Price Alerts <alerts@example.com>`.
    pub from: String,
    /// Upper bound for a single send, connection included.
    pub send_timeout: Duration,
}
