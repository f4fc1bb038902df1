//! Bill-level money totals.

use super::selection::SelectionState;
use crate::models::{Bill, LineItem, PaymentRecord};
use rust_decimal::Decimal;
use serde::Serialize;

/// Value of every line item at its unit price.
pub fn total(line_items: &[LineItem]) -> Decimal {
    line_items
        .iter()
        .map(LineItem::total_price)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

fn unit_price(bill: &Bill, line_item: i32) -> Decimal {
    bill.line_item(line_item)
        .map(|item| item.unit_price)
        .unwrap_or(Decimal::ZERO)
}

/// What the participant's current selection is worth.
pub fn current_share(bill: &Bill, state: &SelectionState) -> Decimal {
    state
        .items()
        .iter()
        .map(|item| item.current_amount().saturating_mul(unit_price(bill, item.index())))
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Money value of a single recorded payment.
pub fn payment_value(bill: &Bill, payment: &PaymentRecord) -> Decimal {
    payment
        .line_items
        .iter()
        .map(|line| line.amount.saturating_mul(unit_price(bill, line.line_item_ref)))
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

pub fn paid_previously(bill: &Bill) -> Decimal {
    bill.payment_items
        .iter()
        .map(|payment| payment_value(bill, payment))
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Left over once earlier payments and the current share are accounted for.
pub fn remaining(bill: &Bill, total: Decimal, current_share: Decimal) -> Decimal {
    total
        .saturating_sub(paid_previously(bill))
        .saturating_sub(current_share)
}

/// The bill split into what was paid, what is being paid and what is left.
///
/// `remaining` is derived as `total - paid - current_share`, so the three parts
/// add back up to `total` for any bill within the quantity and price limits.
/// Beyond them the sums saturate rather than overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total: Decimal,
    pub paid: Decimal,
    pub current_share: Decimal,
    pub remaining: Decimal,
}

impl Totals {
    pub fn compute(bill: &Bill, state: &SelectionState) -> Self {
        let total = total(&bill.line_items);
        let paid = paid_previously(bill);
        let current_share = current_share(bill, state);

        Self {
            total,
            paid,
            current_share,
            remaining: total.saturating_sub(paid).saturating_sub(current_share),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentLine;
    use crate::settlement::{derive_selection_state, SelectionAction, Step};
    use chrono::{NaiveDate, Utc};
    use std::str::FromStr;
    use uuid::Uuid;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lunch() -> Bill {
        Bill {
            id: Uuid::new_v4(),
            share_code: "lunch".to_string(),
            name: "Lunch".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            currency: "EUR".to_string(),
            service_fee: None,
            payment_method: "NL00BANK0123".to_string(),
            created_on: Utc::now(),
            number_of_payments: 1,
            line_items: vec![
                LineItem {
                    index: 0,
                    description: "Coffee".to_string(),
                    amount: d("3"),
                    unit_price: d("2.5"),
                },
                LineItem {
                    index: 1,
                    description: "Cake".to_string(),
                    amount: d("2"),
                    unit_price: d("4"),
                },
            ],
            payment_items: vec![PaymentRecord {
                id: "p1".to_string(),
                creator: "ana".to_string(),
                created_on: Utc::now(),
                line_items: vec![PaymentLine {
                    line_item_ref: 0,
                    amount: d("1"),
                }],
            }],
        }
    }

    #[test]
    fn totals_add_up() {
        let bill = lunch();
        let mut state = derive_selection_state(&bill);
        state
            .apply(&SelectionAction::AmountChange {
                line_item: 1,
                step: Step::Increment,
            })
            .unwrap();

        let totals = Totals::compute(&bill, &state);
        assert_eq!(totals.total, d("15.5"));
        assert_eq!(totals.paid, d("2.5"));
        assert_eq!(totals.current_share, d("4"));
        assert_eq!(totals.remaining, d("9"));
        assert_eq!(
            totals.paid + totals.current_share + totals.remaining,
            totals.total
        );
        assert_eq!(remaining(&bill, totals.total, totals.current_share), d("9"));
    }

    #[test]
    fn oversized_ledgers_saturate() {
        let mut bill = lunch();
        bill.line_items[0].amount = d("50000000000000000000000000000");
        bill.line_items[0].unit_price = Decimal::ONE;
        bill.line_items[1].amount = d("50000000000000000000000000000");
        bill.line_items[1].unit_price = Decimal::ONE;

        assert_eq!(total(&bill.line_items), Decimal::MAX);
        let totals = Totals::compute(&bill, &derive_selection_state(&bill));
        assert_eq!(totals.total, Decimal::MAX);
    }

    #[test]
    fn payment_value_uses_ledger_prices() {
        let bill = lunch();
        assert_eq!(payment_value(&bill, &bill.payment_items[0]), d("2.5"));
    }
}
