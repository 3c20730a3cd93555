use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// Day / month / year self-purchase totals around a reference date.
#[derive(Debug, Serialize)]
pub struct MyCartSummaryResponse {
    pub reference_date: NaiveDate,
    pub daily_total_usd: Decimal,
    pub daily_total_lbp: Decimal,
    pub monthly_total_usd: Decimal,
    pub monthly_total_lbp: Decimal,
    pub yearly_total_usd: Decimal,
    pub yearly_total_lbp: Decimal,
}

#[derive(Debug, Serialize, FromRow)]
pub struct PersonalPurchaseResponse {
    pub id: i64,
    pub transaction_id: i64,
    pub transaction_number: String,
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub purchase_date: DateTime<Utc>,
}
