use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::BalanceBreakdown;
use crate::models::transaction::{PosTransaction, TransactionLine};
use crate::pricing::PricedLine;

#[derive(Debug, Clone, Deserialize)]
pub struct CartItemRequest {
    /// Required unless the line points at an offer.
    pub product_id: Option<i64>,
    pub quantity: Decimal,
    pub price_rule_id: Option<i64>,
    pub offer_id: Option<i64>,
    pub manual_discount_percent: Option<Decimal>,
    pub manual_unit_price_usd: Option<Decimal>,
    pub manual_unit_price_lbp: Option<Decimal>,
    pub manual_total_usd: Option<Decimal>,
    pub manual_total_lbp: Option<Decimal>,
    #[serde(default)]
    pub is_waste: bool,
}

impl CartItemRequest {
    pub fn has_manual_price(&self) -> bool {
        self.manual_discount_percent.is_some()
            || self.manual_unit_price_usd.is_some()
            || self.manual_unit_price_lbp.is_some()
            || self.manual_total_usd.is_some()
            || self.manual_total_lbp.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    pub paid_usd: Decimal,
    #[serde(default)]
    pub paid_lbp: Decimal,
    /// 0 or absent = use the current configured rate.
    #[serde(default)]
    pub exchange_rate: Decimal,
    pub manual_total_usd: Option<Decimal>,
    pub manual_total_lbp: Option<Decimal>,
    #[serde(default)]
    pub save_to_my_cart: bool,
    /// Set on resubmission to accept an anomaly-gated cart as-is.
    #[serde(default)]
    pub confirm_override: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    pub paid_usd: Decimal,
    #[serde(default)]
    pub paid_lbp: Decimal,
    pub manual_total_usd: Option<Decimal>,
    pub manual_total_lbp: Option<Decimal>,
    #[serde(default)]
    pub save_to_my_cart: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub transaction_id: i64,
    /// Absent = return every line of the original transaction.
    pub line_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct ComputeBalanceRequest {
    pub total_usd: Decimal,
    #[serde(default)]
    pub paid_usd: Decimal,
    #[serde(default)]
    pub paid_lbp: Decimal,
    #[serde(default)]
    pub exchange_rate: Decimal,
    pub total_lbp: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub balance_usd: Decimal,
    pub balance_lbp: Decimal,
}

impl From<BalanceBreakdown> for BalanceResponse {
    fn from(b: BalanceBreakdown) -> Self {
        BalanceResponse {
            total_usd: b.total_usd,
            total_lbp: b.total_lbp,
            balance_usd: b.balance_usd,
            balance_lbp: b.balance_lbp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionLineResponse {
    pub id: Option<i64>,
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

impl From<&PricedLine> for TransactionLineResponse {
    fn from(line: &PricedLine) -> Self {
        TransactionLineResponse {
            id: None,
            product_id: line.product_id,
            price_rule_id: line.price_rule_id,
            offer_id: line.offer_id,
            quantity: line.quantity,
            base_unit_price_usd: line.base_unit_price_usd,
            base_unit_price_lbp: line.base_unit_price_lbp,
            unit_price_usd: line.unit_price_usd,
            unit_price_lbp: line.unit_price_lbp,
            discount_percent: line.discount_percent,
            total_usd: line.total_usd,
            total_lbp: line.total_lbp,
            cost_usd: line.cost_usd,
            cost_lbp: line.cost_lbp,
            profit_usd: line.profit_usd,
            profit_lbp: line.profit_lbp,
            is_waste: line.is_waste,
            has_manual_price_override: line.has_manual_price_override,
        }
    }
}

impl From<TransactionLine> for TransactionLineResponse {
    fn from(line: TransactionLine) -> Self {
        TransactionLineResponse {
            id: Some(line.id),
            product_id: line.product_id,
            price_rule_id: line.price_rule_id,
            offer_id: line.offer_id,
            quantity: line.quantity,
            base_unit_price_usd: line.base_unit_price_usd,
            base_unit_price_lbp: line.base_unit_price_lbp,
            unit_price_usd: line.unit_price_usd,
            unit_price_lbp: line.unit_price_lbp,
            discount_percent: line.discount_percent,
            total_usd: line.total_usd,
            total_lbp: line.total_lbp,
            cost_usd: line.cost_usd,
            cost_lbp: line.cost_lbp,
            profit_usd: line.profit_usd,
            profit_lbp: line.profit_lbp,
            is_waste: line.is_waste,
            has_manual_price_override: line.has_manual_price_override,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub transaction_number: String,
    pub transaction_type: String,
    pub user_id: i64,
    pub exchange_rate_used: Decimal,
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub paid_usd: Decimal,
    pub paid_lbp: Decimal,
    pub balance_usd: Decimal,
    pub balance_lbp: Decimal,
    pub has_manual_total_override: bool,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<TransactionLineResponse>,
}

impl TransactionResponse {
    pub fn from_parts(transaction: PosTransaction, lines: Vec<TransactionLine>) -> Self {
        TransactionResponse {
            id: transaction.id,
            transaction_number: transaction.transaction_number,
            transaction_type: transaction.transaction_type,
            user_id: transaction.user_id,
            exchange_rate_used: transaction.exchange_rate_used,
            total_usd: transaction.total_usd,
            total_lbp: transaction.total_lbp,
            paid_usd: transaction.paid_usd,
            paid_lbp: transaction.paid_lbp,
            balance_usd: transaction.balance_usd,
            balance_lbp: transaction.balance_lbp,
            has_manual_total_override: transaction.has_manual_total_override,
            created_at: transaction.created_at,
            lines: lines.into_iter().map(TransactionLineResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub transaction_id: i64,
    pub transaction_number: String,
    pub receipt_base64: String,
}

/// Checkout either settles (id/number/receipt present) or is held for
/// override confirmation (requires_override with the priced preview only).
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub transaction_id: Option<i64>,
    pub transaction_number: Option<String>,
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub balance_usd: Decimal,
    pub balance_lbp: Decimal,
    pub lines: Vec<TransactionLineResponse>,
    pub requires_override: bool,
    pub override_reason: Option<String>,
    pub receipt_base64: String,
}
