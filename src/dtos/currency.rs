use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::currency_rate::CurrencyRate;

#[derive(Debug, Deserialize)]
pub struct CreateRateRequest {
    pub rate: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub id: i64,
    pub rate: Decimal,
    pub notes: Option<String>,
    pub entered_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<CurrencyRate> for RateResponse {
    fn from(r: CurrencyRate) -> Self {
        RateResponse {
            id: r.id,
            rate: r.rate,
            notes: r.notes,
            entered_by: r.entered_by,
            created_at: r.created_at,
        }
    }
}
