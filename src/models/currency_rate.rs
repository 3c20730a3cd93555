use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// One row of the append-only exchange-rate log (LBP per USD, always > 0).
#[derive(Debug, Clone, FromRow)]
pub struct CurrencyRate {
    pub id: i64,
    pub rate: Decimal,
    pub notes: Option<String>,
    pub entered_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}
