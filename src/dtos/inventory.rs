use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::currency::{round_lbp, round_usd};
use crate::models::inventory::InventoryRecord;

/// Joined inventory + product row for the stock overview screen.
#[derive(Debug, Serialize, FromRow)]
pub struct InventorySummaryRow {
    pub product_id: i64,
    pub product_name: String,
    pub barcode: String,
    pub quantity_on_hand: Decimal,
    pub reorder_point: Decimal,
    pub is_reorder_alarm_enabled: bool,
    pub average_cost_usd: Decimal,
    pub average_cost_lbp: Decimal,
    pub last_restocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct InventorySummaryResponse {
    pub product_id: i64,
    pub product_name: String,
    pub barcode: String,
    pub quantity_on_hand: Decimal,
    pub reorder_point: Decimal,
    pub needs_reorder: bool,
    pub average_cost_usd: Decimal,
    pub average_cost_lbp: Decimal,
    /// On-hand quantity valued at the moving-average cost.
    pub stock_value_usd: Decimal,
    pub stock_value_lbp: Decimal,
    pub last_restocked_at: Option<DateTime<Utc>>,
}

impl From<InventorySummaryRow> for InventorySummaryResponse {
    fn from(row: InventorySummaryRow) -> Self {
        let needs_reorder =
            row.is_reorder_alarm_enabled && row.quantity_on_hand <= row.reorder_point;
        InventorySummaryResponse {
            product_id: row.product_id,
            product_name: row.product_name,
            barcode: row.barcode,
            quantity_on_hand: row.quantity_on_hand,
            reorder_point: row.reorder_point,
            needs_reorder,
            average_cost_usd: row.average_cost_usd,
            average_cost_lbp: row.average_cost_lbp,
            stock_value_usd: round_usd(row.quantity_on_hand * row.average_cost_usd),
            stock_value_lbp: round_lbp(row.quantity_on_hand * row.average_cost_lbp),
            last_restocked_at: row.last_restocked_at,
        }
    }
}

/// Stock overview plus the aggregate valuation across all listed items.
#[derive(Debug, Serialize)]
pub struct InventoryValuationResponse {
    pub items: Vec<InventorySummaryResponse>,
    pub total_stock_value_usd: Decimal,
    pub total_stock_value_lbp: Decimal,
}

impl InventoryValuationResponse {
    pub fn from_items(items: Vec<InventorySummaryResponse>) -> Self {
        let total_stock_value_usd = round_usd(items.iter().map(|i| i.stock_value_usd).sum());
        let total_stock_value_lbp = round_lbp(items.iter().map(|i| i.stock_value_lbp).sum());
        InventoryValuationResponse {
            items,
            total_stock_value_usd,
            total_stock_value_lbp,
        }
    }
}

/// Raw per-product stock record, used by the cashier's product lookup.
#[derive(Debug, Serialize)]
pub struct InventoryRecordResponse {
    pub product_id: i64,
    pub quantity_on_hand: Decimal,
    pub reorder_point: Decimal,
    pub reorder_quantity: Decimal,
    pub needs_reorder: bool,
    pub average_cost_usd: Decimal,
    pub average_cost_lbp: Decimal,
    pub last_restocked_at: Option<DateTime<Utc>>,
}

impl From<InventoryRecord> for InventoryRecordResponse {
    fn from(record: InventoryRecord) -> Self {
        let needs_reorder = record.needs_reorder();
        InventoryRecordResponse {
            product_id: record.product_id,
            quantity_on_hand: record.quantity_on_hand,
            reorder_point: record.reorder_point,
            reorder_quantity: record.reorder_quantity,
            needs_reorder,
            average_cost_usd: record.average_cost_usd,
            average_cost_lbp: record.average_cost_lbp,
            last_restocked_at: record.last_restocked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(product_id: i64, quantity: Decimal, avg_usd: Decimal) -> InventorySummaryRow {
        InventorySummaryRow {
            product_id,
            product_name: format!("Product {product_id}"),
            barcode: format!("BC-{product_id}"),
            quantity_on_hand: quantity,
            reorder_point: dec!(0),
            is_reorder_alarm_enabled: false,
            average_cost_usd: avg_usd,
            average_cost_lbp: avg_usd * dec!(90000),
            last_restocked_at: None,
        }
    }

    #[test]
    fn stock_is_valued_at_average_cost() {
        let summary = InventorySummaryResponse::from(row(1, dec!(3), dec!(2.50)));
        assert_eq!(summary.stock_value_usd, dec!(7.50));
        assert_eq!(summary.stock_value_lbp, dec!(675000));
    }

    #[test]
    fn valuation_totals_sum_over_all_items() {
        let items = vec![
            InventorySummaryResponse::from(row(1, dec!(3), dec!(2.50))),
            InventorySummaryResponse::from(row(2, dec!(10), dec!(1.20))),
        ];
        let valuation = InventoryValuationResponse::from_items(items);
        assert_eq!(valuation.total_stock_value_usd, dec!(19.50));
        assert_eq!(valuation.total_stock_value_lbp, dec!(1755000));
        assert_eq!(valuation.items.len(), 2);
    }
}
