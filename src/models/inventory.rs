use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// Per-product stock level and moving-average unit cost. The USD and LBP
/// averages are snapshots taken at the last cost-affecting mutation; they are
/// not re-derived from the live rate.
#[derive(Debug, Clone, FromRow)]
pub struct InventoryRecord {
    pub id: i64,
    pub product_id: i64,
    pub quantity_on_hand: Decimal,
    pub reorder_point: Decimal,
    pub reorder_quantity: Decimal,
    pub is_reorder_alarm_enabled: bool,
    pub average_cost_usd: Decimal,
    pub average_cost_lbp: Decimal,
    pub last_restocked_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// Derived, never persisted.
    pub fn needs_reorder(&self) -> bool {
        self.is_reorder_alarm_enabled && self.quantity_on_hand <= self.reorder_point
    }
}
