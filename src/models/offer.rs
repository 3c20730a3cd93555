use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// Fixed-price bundle of specific products sold as one priced unit.
#[derive(Debug, Clone, FromRow)]
pub struct Offer {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_usd: Decimal,
    pub price_lbp: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OfferItem {
    pub id: i64,
    pub offer_id: i64,
    pub product_id: i64,
    pub quantity: Decimal,
}
