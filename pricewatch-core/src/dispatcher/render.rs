//! Plain-text message rendering.
//!
//! Pure: the same context always yields the same bytes.

use crate::entities::AlertContext;

/// Subject line of every alert notification.
pub const SUBJECT: &str = "Stock Price Crossed";

/// Render the notification body for `context`.
pub fn render_body(context: &AlertContext) -> String {
    format!(
        "Alert Triggered: {name}\n\
         Asset: {asset_name} ({symbol})\n\
         Type: {kind}\n\
         Condition: {condition}\n\
         Target Value: {target}\n\
         Alert Method: {method}\n\
         \n\
         User Details:\n\
         Email: {email}\n\
         Messaging Handle: {handle}\n",
        name = context.alert_name,
        asset_name = context.asset.name,
        symbol = context.asset.symbol,
        kind = context.asset.kind,
        condition = context.condition,
        target = context.target_value.normalize(),
        method = context.method,
        email = context.recipient.email,
        handle = context.recipient.messaging_handle.as_deref().unwrap_or("-"),
    )
}
