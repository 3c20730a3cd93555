use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PurchaseItemRequest {
    /// Resolve by id, else by barcode, else auto-create from name.
    pub product_id: Option<i64>,
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    /// "USD" (default) or "LBP".
    pub currency: Option<String>,
    /// When set, also updates the product's sale price.
    pub sale_price_usd: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub supplier_name: Option<String>,
    pub reference: Option<String>,
    #[serde(default)]
    pub exchange_rate: Decimal,
    pub purchased_at: Option<DateTime<Utc>>,
    pub items: Vec<PurchaseItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseLineResponse {
    pub id: i64,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: Decimal,
    pub unit_cost_usd: Decimal,
    pub unit_cost_lbp: Decimal,
    pub total_cost_usd: Decimal,
    pub total_cost_lbp: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub id: i64,
    pub supplier_name: String,
    pub reference: Option<String>,
    pub exchange_rate_used: Decimal,
    pub total_cost_usd: Decimal,
    pub total_cost_lbp: Decimal,
    pub purchased_at: DateTime<Utc>,
    pub lines: Vec<PurchaseLineResponse>,
}
