pub mod alert_context;

pub use alert_context::{AlertContext, AlertContextRow, AssetInfo, FetchAlertContext, Recipient};
