// src/inventory.rs
//
// Quantity-on-hand and moving-average unit cost per product. Receipts blend
// into the average; consumption and restoration never touch it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::{Postgres, Transaction};

use crate::currency::{round_usd, usd_to_lbp};
use crate::error::AppError;
use crate::models::inventory::InventoryRecord;

/// Weighted average of the existing stock and an incoming receipt, rounded
/// to USD precision. Callers must ensure `existing_qty + quantity > 0`.
pub fn weighted_average(
    existing_qty: Decimal,
    existing_avg: Decimal,
    quantity: Decimal,
    unit_cost: Decimal,
) -> Decimal {
    let blended = (existing_qty * existing_avg + quantity * unit_cost) / (existing_qty + quantity);
    round_usd(blended)
}

/// Consumption clamps at zero; selling more than is on hand must not drive
/// the ledger negative.
pub fn consume_quantity(on_hand: Decimal, quantity: Decimal) -> Decimal {
    (on_hand - quantity).max(dec!(0))
}

/// Applies a stock receipt inside the caller's database transaction,
/// creating the record on first receipt. A receipt that leaves the quantity
/// at or below zero resets the average to the incoming unit cost instead of
/// dividing by a non-positive quantity.
pub async fn receive_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    quantity: Decimal,
    unit_cost_usd: Decimal,
    rate: Decimal,
) -> Result<(), AppError> {
    let existing = sqlx::query_as::<_, InventoryRecord>(
        "SELECT * FROM inventory WHERE product_id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;

    let (existing_qty, existing_avg) = match existing {
        Some(record) => (record.quantity_on_hand, record.average_cost_usd),
        None => {
            sqlx::query(
                "INSERT INTO inventory (product_id, quantity_on_hand, average_cost_usd, average_cost_lbp)
                 VALUES ($1, 0, $2, $3)",
            )
            .bind(product_id)
            .bind(round_usd(unit_cost_usd))
            .bind(usd_to_lbp(unit_cost_usd, rate))
            .execute(&mut **tx)
            .await?;
            (dec!(0), round_usd(unit_cost_usd))
        }
    };

    let new_qty = existing_qty + quantity;
    let (stored_qty, average_usd) = if new_qty <= dec!(0) {
        (dec!(0), round_usd(unit_cost_usd))
    } else {
        (
            new_qty,
            weighted_average(existing_qty, existing_avg, quantity, unit_cost_usd),
        )
    };

    sqlx::query(
        "UPDATE inventory
         SET quantity_on_hand = $2,
             average_cost_usd = $3,
             average_cost_lbp = $4,
             last_restocked_at = NOW()
         WHERE product_id = $1",
    )
    .bind(product_id)
    .bind(stored_qty)
    .bind(average_usd)
    .bind(usd_to_lbp(average_usd, rate))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Decrements stock for a settled sale line. The quantity is signed: sale
/// lines subtract, return lines (negative quantity) add back. Average cost
/// is untouched; the sold line already carries its cost snapshot.
pub async fn consume(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    quantity: Decimal,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE inventory
         SET quantity_on_hand = GREATEST(0, quantity_on_hand - $2)
         WHERE product_id = $1",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Adds quantity back on return or transaction-edit reversal. No cost change.
pub async fn restore(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    quantity: Decimal,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE inventory
         SET quantity_on_hand = GREATEST(0, quantity_on_hand + $2)
         WHERE product_id = $1",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn blends_receipts_into_weighted_average() {
        // 10 @ $2.00 then 5 @ $3.50 -> (20 + 17.5) / 15 = 2.50
        let avg = weighted_average(dec!(10), dec!(2.00), dec!(5), dec!(3.50));
        assert_eq!(avg, dec!(2.50));
    }

    #[test]
    fn weighted_average_matches_formula_within_rounding() {
        let avg = weighted_average(dec!(3), dec!(1.99), dec!(7), dec!(2.45));
        // (3*1.99 + 7*2.45) / 10 = 2.312 -> 2.31
        assert_eq!(avg, dec!(2.31));
    }

    #[test]
    fn first_receipt_uses_incoming_cost() {
        let avg = weighted_average(dec!(0), dec!(0), dec!(4), dec!(1.25));
        assert_eq!(avg, dec!(1.25));
    }

    #[test]
    fn consumption_clamps_at_zero() {
        assert_eq!(consume_quantity(dec!(2), dec!(5)), dec!(0));
        assert_eq!(consume_quantity(dec!(5), dec!(2)), dec!(3));
    }

    #[test]
    fn negative_quantity_restores_stock() {
        // Return lines consume a negative quantity.
        assert_eq!(consume_quantity(dec!(2), dec!(-3)), dec!(5));
    }
}
