//! Rebuilds claim state from a bill's payment log and checks new claims against it.

use super::selection::{Contribution, ItemSelection, SelectionState};
use super::SettlementError;
use crate::models::{Bill, LineItem, PaymentLine};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Fresh selection state for a participant opening the bill.
///
/// Items that can still be claimed come first, then fully claimed ones, each
/// group in line item order.
pub fn derive_selection_state(bill: &Bill) -> SelectionState {
    let mut items: Vec<ItemSelection> = bill
        .line_items
        .iter()
        .map(|line_item| ItemSelection::new(line_item.clone(), contributions(bill, line_item.index)))
        .collect();

    items.sort_by(|a, b| {
        a.is_fully_claimed()
            .cmp(&b.is_fully_claimed())
            .then_with(|| a.index().cmp(&b.index()))
    });

    SelectionState::new(items)
}

/// Per-creator totals for one item, in order of each creator's first payment.
pub fn contributions(bill: &Bill, line_item: i32) -> Vec<Contribution> {
    let mut contributions: Vec<Contribution> = Vec::new();

    for payment in &bill.payment_items {
        for line in payment
            .line_items
            .iter()
            .filter(|line| line.line_item_ref == line_item)
        {
            match contributions
                .iter_mut()
                .find(|c| c.creator == payment.creator)
            {
                Some(existing) => existing.amount = existing.amount.saturating_add(line.amount),
                None => contributions.push(Contribution {
                    creator: payment.creator.clone(),
                    amount: line.amount,
                }),
            }
        }
    }

    contributions.retain(|c| c.amount > Decimal::ZERO);
    contributions
}

/// Quantity claimed so far, keyed by line item index.
pub fn claimed_amounts(bill: &Bill) -> HashMap<i32, Decimal> {
    let mut claimed = HashMap::new();
    for line in bill.payment_items.iter().flat_map(|p| &p.line_items) {
        let total = claimed.entry(line.line_item_ref).or_insert(Decimal::ZERO);
        *total = total.saturating_add(line.amount);
    }
    claimed
}

/// Check a new payment against what is still unclaimed.
///
/// Lines for the same item are summed before comparing. Sums that do not fit
/// in a [`Decimal`] count as over-claims.
pub fn validate_claims(
    line_items: &[LineItem],
    claimed: &HashMap<i32, Decimal>,
    lines: &[PaymentLine],
) -> Result<(), SettlementError> {
    if lines.is_empty() {
        return Err(SettlementError::EmptyPayment);
    }

    let mut requested: Vec<(i32, Decimal)> = Vec::new();
    for line in lines {
        if line.amount <= Decimal::ZERO {
            return Err(SettlementError::NonPositiveAmount(line.line_item_ref));
        }
        match requested.iter_mut().find(|(index, _)| *index == line.line_item_ref) {
            Some((_, amount)) => *amount = amount.saturating_add(line.amount),
            None => requested.push((line.line_item_ref, line.amount)),
        }
    }

    for (index, amount) in requested {
        let item = line_items
            .iter()
            .find(|item| item.index == index)
            .ok_or(SettlementError::UnknownLineItem(index))?;
        let already = claimed.get(&index).copied().unwrap_or(Decimal::ZERO);

        let over = already
            .checked_add(amount)
            .map_or(true, |total| total > item.amount);
        if over {
            return Err(SettlementError::OverClaimed {
                line_item: index,
                requested: amount,
                available: (item.amount - already).max(Decimal::ZERO),
            });
        }
    }

    Ok(())
}
