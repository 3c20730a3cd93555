use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Return,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Return => "return",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PosTransaction {
    pub id: i64,
    pub transaction_number: String,
    // "sale" | "return"
    pub transaction_type: String,
    pub user_id: i64,
    // Frozen at settlement time, never recomputed retroactively.
    pub exchange_rate_used: Decimal,
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub paid_usd: Decimal,
    pub paid_lbp: Decimal,
    pub balance_usd: Decimal,
    pub balance_lbp: Decimal,
    pub has_manual_total_override: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionLine {
    pub id: i64,
    pub transaction_id: i64,
    // Kept after product deletion so history stays intact.
    pub product_id: Option<i64>,
    pub price_rule_id: Option<i64>,
    pub offer_id: Option<i64>,
    pub quantity: Decimal,
    pub base_unit_price_usd: Decimal,
    pub base_unit_price_lbp: Decimal,
    pub unit_price_usd: Decimal,
    pub unit_price_lbp: Decimal,
    pub discount_percent: Decimal,
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub cost_usd: Decimal,
    pub cost_lbp: Decimal,
    pub profit_usd: Decimal,
    pub profit_lbp: Decimal,
    pub is_waste: bool,
    pub has_manual_price_override: bool,
}
