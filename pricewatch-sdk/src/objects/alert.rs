use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Delivery method chosen by the user for an alert.
#[serde(rename_all = "UPPERCASE")]
pub enum AlertMethod {
    Email,
    Sms,
    Push,
    /// Chat-bot delivery. Older rows store this as `TELEGRAM` or `WHATSAPP`.
    #[serde(alias = "TELEGRAM", alias = "WHATSAPP")]
    Messaging,
}

impl AlertMethod {
    pub const ALL: [AlertMethod; 4] = [
        AlertMethod::Email,
        AlertMethod::Sms,
        AlertMethod::Push,
        AlertMethod::Messaging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertMethod::Email => "EMAIL",
            AlertMethod::Sms => "SMS",
            AlertMethod::Push => "PUSH",
            AlertMethod::Messaging => "MESSAGING",
        }
    }
}

impl fmt::Display for AlertMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(AlertMethod::Email),
            "SMS" => Ok(AlertMethod::Sms),
            "PUSH" => Ok(AlertMethod::Push),
            "MESSAGING" | "TELEGRAM" | "WHATSAPP" => Ok(AlertMethod::Messaging),
            _ => Err(UnknownVariant {
                kind: "alert method",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Direction in which the price has to cross the target value.
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionType {
    Above,
    Below,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Above => "ABOVE",
            ConditionType::Below => "BELOW",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ABOVE" => Ok(ConditionType::Above),
            "BELOW" => Ok(ConditionType::Below),
            _ => Err(UnknownVariant {
                kind: "condition type",
                value: s.to_owned(),
            }),
        }
    }
}

/// A stored enum value that this version does not know about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_method_parsing() {
        assert_eq!("EMAIL".parse::<AlertMethod>(), Ok(AlertMethod::Email));
        assert_eq!("sms".parse::<AlertMethod>(), Ok(AlertMethod::Sms));
        assert_eq!("TELEGRAM".parse::<AlertMethod>(), Ok(AlertMethod::Messaging));
        assert_eq!("WHATSAPP".parse::<AlertMethod>(), Ok(AlertMethod::Messaging));
        assert!("PIGEON".parse::<AlertMethod>().is_err());
    }

    #[test]
    fn test_alert_method_serde() {
        let method: AlertMethod = serde_json::from_str("\"TELEGRAM\"").unwrap();
        assert_eq!(method, AlertMethod::Messaging);
        assert_eq!(
            serde_json::to_string(&AlertMethod::Push).unwrap(),
            "\"PUSH\""
        );
    }

    #[test]
    fn test_condition_display_round_trips() {
        for condition in [ConditionType::Above, ConditionType::Below] {
            assert_eq!(condition.to_string().parse::<ConditionType>(), Ok(condition));
        }
    }
}
