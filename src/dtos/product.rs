use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::product::{PriceRule, Product};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub barcode: String,
    pub sku: Option<String>,
    pub category_id: Option<i64>,
    pub price_usd: Decimal,
    /// Absent = derived from the current rate at creation time.
    pub price_lbp: Option<Decimal>,
    #[serde(default)]
    pub is_pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub barcode: String,
    pub sku: Option<String>,
    pub category_id: Option<i64>,
    pub price_usd: Decimal,
    pub price_lbp: Decimal,
    pub is_active: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id,
            name: p.name,
            barcode: p.barcode,
            sku: p.sku,
            category_id: p.category_id,
            price_usd: p.price_usd,
            price_lbp: p.price_lbp,
            is_active: p.is_active,
            is_pinned: p.is_pinned,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePriceRuleRequest {
    pub product_id: i64,
    pub discount_percent: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct PriceRuleResponse {
    pub id: i64,
    pub product_id: i64,
    pub discount_percent: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl From<PriceRule> for PriceRuleResponse {
    fn from(r: PriceRule) -> Self {
        PriceRuleResponse {
            id: r.id,
            product_id: r.product_id,
            discount_percent: r.discount_percent,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
            description: r.description,
            is_active: r.is_active,
        }
    }
}
