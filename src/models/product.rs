use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub barcode: String,
    pub sku: Option<String>,
    pub category_id: Option<i64>,
    // price_lbp is re-derivable from price_usd at the current rate but is
    // persisted for display stability.
    pub price_usd: Decimal,
    pub price_lbp: Decimal,
    pub is_active: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

/// Time-windowed percentage markdown attached to one product.
#[derive(Debug, Clone, FromRow)]
pub struct PriceRule {
    pub id: i64,
    pub product_id: i64,
    pub discount_percent: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl PriceRule {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= at && self.ends_at.map_or(true, |end| end >= at)
    }
}
