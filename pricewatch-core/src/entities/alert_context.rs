use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use pricewatch_sdk::{AlertMethod, AlertRef, ConditionType};
use rust_decimal::Decimal;

/// Everything needed to render and deliver a notification for one alert.
///
/// Fetched fresh for every dequeued reference and never written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContext {
    pub alert_ref: AlertRef,
    pub alert_name: String,
    pub condition: ConditionType,
    pub target_value: Decimal,
    pub method: AlertMethod,
    pub is_active: bool,
    pub asset: AssetInfo,
    pub recipient: Recipient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub symbol: String,
    pub name: String,
    /// Asset class as stored, e.g. `STOCK`, `MUTUALFUND`, `COMMODITY`.
    pub kind: String,
}

/// Contact details of the alert owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    /// Chat id for the messaging channel, if the user linked one.
    pub messaging_handle: Option<String>,
}

/// Raw row as selected; enum columns come back as text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertContextRow {
    pub alert_name: String,
    pub condition_type: String,
    pub target_value: Decimal,
    pub alert_method: String,
    pub is_active: bool,
    pub email: String,
    pub telegram_id: Option<String>,
    pub asset_symbol: String,
    pub asset_name: String,
    pub asset_type: String,
}

impl AlertContextRow {
    /// Interpret the row. Fails with a description of the offending column.
    pub fn into_context(self, alert_ref: AlertRef) -> Result<AlertContext, String> {
        let condition: ConditionType = self.condition_type.parse::<ConditionType>().map_err(|e| e.to_string())?;
        let method: AlertMethod = self.alert_method.parse::<AlertMethod>().map_err(|e| e.to_string())?;
        let messaging_handle = self
            .telegram_id
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty());

        Ok(AlertContext {
            alert_ref,
            alert_name: self.alert_name,
            condition,
            target_value: self.target_value,
            method,
            is_active: self.is_active,
            asset: AssetInfo {
                symbol: self.asset_symbol,
                name: self.asset_name,
                kind: self.asset_type,
            },
            recipient: Recipient {
                email: self.email,
                messaging_handle,
            },
        })
    }
}

/// Point lookup of an alert with its owner and asset.
#[derive(Debug, Clone)]
pub struct FetchAlertContext {
    pub alert_ref: AlertRef,
}

impl Processor<FetchAlertContext> for DatabaseProcessor {
    type Output = Option<AlertContextRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:FetchAlertContext")]
    async fn process(
        &self,
        query: FetchAlertContext,
    ) -> Result<Option<AlertContextRow>, sqlx::Error> {
        let row = sqlx::query_as::<_, AlertContextRow>(
            r#"
            SELECT
                a."alertName" AS alert_name,
                a."conditionType"::text AS condition_type,
                a."targetValue"::numeric AS target_value,
                a."alertMethod"::text AS alert_method,
                a."isActive" AS is_active,
                u.email AS email,
                u.telegramid AS telegram_id,
                s."assetSymbol" AS asset_symbol,
                s.assetname AS asset_name,
                s."assetType"::text AS asset_type
            FROM "Alert" a
            JOIN "User" u ON u.id = a."userId"
            JOIN "Asset" s ON s.id = a."assetId"
            WHERE a.id = $1
            "#,
        )
        .bind(query.alert_ref.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
