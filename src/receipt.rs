// src/receipt.rs
//
// Plain-text receipt for the cashier display / thermal printer bridge,
// shipped to the client base64-encoded.

use base64::{engine::general_purpose::STANDARD, Engine};
use rust_decimal::Decimal;

use crate::models::transaction::{PosTransaction, TransactionLine};

const WIDTH: usize = 40;

pub fn render(
    transaction: &PosTransaction,
    lines: &[(TransactionLine, Option<String>)],
    rate: Decimal,
) -> String {
    let mut out = String::new();

    out.push_str(&center("Aurora POS"));
    out.push_str(&center("Receipt"));
    out.push_str(&"-".repeat(WIDTH));
    out.push('\n');
    out.push_str(&format!("No:      {}\n", transaction.transaction_number));
    out.push_str(&format!(
        "Date:    {}\n",
        transaction.created_at.format("%Y-%m-%d %H:%M")
    ));
    out.push_str(&format!("Cashier: {}\n", transaction.user_id));
    out.push_str(&"-".repeat(WIDTH));
    out.push('\n');

    for (line, product_name) in lines {
        let name = product_name
            .clone()
            .or_else(|| line.product_id.map(|id| format!("#{id}")))
            .unwrap_or_else(|| "(deleted)".to_string());
        let qty = line.quantity.normalize();
        let total = format!("${:.2}", line.total_usd);
        let left = format!("{} x{}", truncate(&name, WIDTH - 14), qty);
        out.push_str(&format!(
            "{left}{}{total}\n",
            " ".repeat(WIDTH.saturating_sub(left.len() + total.len()).max(1))
        ));
    }

    out.push_str(&"-".repeat(WIDTH));
    out.push('\n');
    out.push_str(&format!("Total USD:   ${:.2}\n", transaction.total_usd));
    out.push_str(&format!("Total LBP:   {}\n", transaction.total_lbp.normalize()));
    out.push_str(&format!("Paid USD:    ${:.2}\n", transaction.paid_usd));
    out.push_str(&format!("Paid LBP:    {}\n", transaction.paid_lbp.normalize()));
    out.push_str(&format!("Balance USD: ${:.2}\n", transaction.balance_usd));
    out.push_str(&format!("Balance LBP: {}\n", transaction.balance_lbp.normalize()));
    out.push_str(&format!("Rate:        {}\n", rate.normalize()));
    out.push_str(&center("Thank you!"));

    out
}

pub fn render_base64(
    transaction: &PosTransaction,
    lines: &[(TransactionLine, Option<String>)],
    rate: Decimal,
) -> String {
    STANDARD.encode(render(transaction, lines, rate))
}

fn center(text: &str) -> String {
    let pad = WIDTH.saturating_sub(text.len()) / 2;
    format!("{}{text}\n", " ".repeat(pad))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max.saturating_sub(1)).collect::<String>() + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn transaction() -> PosTransaction {
        PosTransaction {
            id: 1,
            transaction_number: "TX-20260825120000".into(),
            transaction_type: "sale".into(),
            user_id: 2,
            exchange_rate_used: dec!(90000),
            total_usd: dec!(30.00),
            total_lbp: dec!(2700000),
            paid_usd: dec!(30.00),
            paid_lbp: dec!(0),
            balance_usd: dec!(0.00),
            balance_lbp: dec!(2700000),
            has_manual_total_override: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn line() -> TransactionLine {
        TransactionLine {
            id: 1,
            transaction_id: 1,
            product_id: Some(7),
            price_rule_id: None,
            offer_id: None,
            quantity: dec!(3),
            base_unit_price_usd: dec!(10.00),
            base_unit_price_lbp: dec!(900000),
            unit_price_usd: dec!(10.00),
            unit_price_lbp: dec!(900000),
            discount_percent: dec!(0),
            total_usd: dec!(30.00),
            total_lbp: dec!(2700000),
            cost_usd: dec!(18.00),
            cost_lbp: dec!(1620000),
            profit_usd: dec!(12.00),
            profit_lbp: dec!(1080000),
            is_waste: false,
            has_manual_price_override: false,
        }
    }

    #[test]
    fn receipt_contains_number_lines_and_totals() {
        let text = render(
            &transaction(),
            &[(line(), Some("Labneh 500g".into()))],
            dec!(90000),
        );
        assert!(text.contains("TX-20260825120000"));
        assert!(text.contains("Labneh 500g x3"));
        assert!(text.contains("$30.00"));
        assert!(text.contains("Total LBP:   2700000"));
    }

    #[test]
    fn base64_round_trips() {
        let tx = transaction();
        let lines = [(line(), None)];
        let encoded = render_base64(&tx, &lines, dec!(90000));
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), render(&tx, &lines, dec!(90000)));
    }

    #[test]
    fn deleted_products_still_render() {
        let mut orphan = line();
        orphan.product_id = None;
        let text = render(&transaction(), &[(orphan, None)], dec!(90000));
        assert!(text.contains("(deleted)"));
    }
}
