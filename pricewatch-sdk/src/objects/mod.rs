pub mod alert;
pub mod alert_ref;

pub use alert::{AlertMethod, ConditionType, UnknownVariant};
pub use alert_ref::{AlertRef, AlertRefError};
