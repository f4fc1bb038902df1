//! Per-participant selection state and the reducer that updates it.

use super::money::round;
use super::SettlementError;
use crate::models::{LineItem, NewPayment, PaymentLine};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a `+` / `-` tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Increment,
    Decrement,
}

impl Step {
    pub fn delta(self) -> Decimal {
        match self {
            Step::Increment => Decimal::ONE,
            Step::Decrement => Decimal::NEGATIVE_ONE,
        }
    }
}

/// How the participant is claiming an item right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    Undecided,
    Itemizing {
        current: Decimal,
        remaining: Decimal,
    },
    Splitting {
        denominator: u32,
        current: Decimal,
        remaining: Decimal,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Undecided,
    Itemize,
    Splitting,
}

impl Allocation {
    pub fn mode(&self) -> Mode {
        match self {
            Allocation::Undecided => Mode::Undecided,
            Allocation::Itemizing { .. } => Mode::Itemize,
            Allocation::Splitting { .. } => Mode::Splitting,
        }
    }
}

/// What one participant has already paid for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub creator: String,
    pub amount: Decimal,
}

/// One line item as seen by the participant making a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSelection {
    pub line_item: LineItem,
    /// Quantity already claimed by recorded payments.
    pub prior_amount: Decimal,
    pub payment_items: Vec<Contribution>,
    pub allocation: Allocation,
}

impl ItemSelection {
    pub fn new(line_item: LineItem, payment_items: Vec<Contribution>) -> Self {
        let prior_amount = payment_items
            .iter()
            .map(|c| c.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add);
        Self {
            line_item,
            prior_amount,
            payment_items,
            allocation: Allocation::Undecided,
        }
    }

    pub fn index(&self) -> i32 {
        self.line_item.index
    }

    /// Largest quantity this participant may still claim.
    ///
    /// Rounded to one decimal, but never above what is actually left, and
    /// never negative when earlier payments already overshot.
    ///
    /// Unlike a plain `round(amount - prior)`, a leftover that would round up
    /// (0.96 to 1.0) is kept as is, so `prior + claimable <= amount` holds.
    pub fn claimable(&self) -> Decimal {
        let left = self
            .line_item
            .amount
            .saturating_sub(self.prior_amount)
            .max(Decimal::ZERO);
        round(left).min(left)
    }

    pub fn current_amount(&self) -> Decimal {
        match self.allocation {
            Allocation::Undecided => Decimal::ZERO,
            Allocation::Itemizing { current, .. } | Allocation::Splitting { current, .. } => current,
        }
    }

    pub fn remaining_amount(&self) -> Decimal {
        match self.allocation {
            Allocation::Undecided => self.claimable(),
            Allocation::Itemizing { remaining, .. } | Allocation::Splitting { remaining, .. } => {
                remaining
            }
        }
    }

    pub fn splitting_denominator(&self) -> Option<u32> {
        match self.allocation {
            Allocation::Splitting { denominator, .. } => Some(denominator),
            _ => None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.allocation.mode()
    }

    /// Nothing left for anyone to claim.
    pub fn is_fully_claimed(&self) -> bool {
        self.claimable() <= Decimal::ZERO
    }
}

/// A single user interaction, addressed by line item index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionAction {
    AmountChange { line_item: i32, step: Step },
    Split { line_item: i32 },
    SplitChange { line_item: i32, step: Step },
}

impl SelectionAction {
    pub fn line_item(&self) -> i32 {
        match *self {
            SelectionAction::AmountChange { line_item, .. }
            | SelectionAction::Split { line_item }
            | SelectionAction::SplitChange { line_item, .. } => line_item,
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            SelectionAction::AmountChange { .. } => "amount_change",
            SelectionAction::Split { .. } => "split",
            SelectionAction::SplitChange { .. } => "split_change",
        }
    }
}

/// Ordered selection for every line item of a bill.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionState {
    items: Vec<ItemSelection>,
}

impl SelectionState {
    pub fn new(items: Vec<ItemSelection>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ItemSelection] {
        &self.items
    }

    pub fn item(&self, line_item: i32) -> Option<&ItemSelection> {
        self.items.iter().find(|item| item.index() == line_item)
    }

    pub fn apply(&mut self, action: &SelectionAction) -> Result<(), SettlementError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.index() == action.line_item())
            .ok_or(SettlementError::UnknownLineItem(action.line_item()))?;

        match *action {
            SelectionAction::AmountChange { step, .. } => item.amount_change(step),
            SelectionAction::Split { .. } => item.split(),
            SelectionAction::SplitChange { step, .. } => item.split_change(step),
        }
        Ok(())
    }

    /// Apply actions in order, stopping at the first one that names an unknown item.
    pub fn replay<'a, I>(&mut self, actions: I) -> Result<(), SettlementError>
    where
        I: IntoIterator<Item = &'a SelectionAction>,
    {
        actions.into_iter().try_for_each(|action| self.apply(action))
    }

    /// Payment lines for every item with a positive current amount.
    pub fn payment_lines(&self) -> Vec<PaymentLine> {
        self.items
            .iter()
            .filter(|item| item.current_amount() > Decimal::ZERO)
            .map(|item| PaymentLine {
                line_item_ref: item.index(),
                amount: item.current_amount(),
            })
            .collect()
    }

    pub fn submission(&self, creator: &str, created_on: DateTime<Utc>) -> NewPayment {
        NewPayment {
            creator: creator.to_string(),
            created_on,
            line_items: self.payment_lines(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: i32, amount: i64) -> ItemSelection {
        ItemSelection::new(
            LineItem {
                index,
                description: format!("item {}", index),
                amount: Decimal::from(amount),
                unit_price: Decimal::from(4),
            },
            Vec::new(),
        )
    }

    #[test]
    fn actions_deserialize_from_tagged_json() {
        let action: SelectionAction =
            serde_json::from_str(r#"{"type":"amount_change","line_item":2,"step":"increment"}"#)
                .unwrap();
        assert_eq!(
            action,
            SelectionAction::AmountChange {
                line_item: 2,
                step: Step::Increment
            }
        );

        let action: SelectionAction =
            serde_json::from_str(r#"{"type":"split","line_item":0}"#).unwrap();
        assert_eq!(action, SelectionAction::Split { line_item: 0 });
    }

    #[test]
    fn unknown_line_item_is_rejected() {
        let mut state = SelectionState::new(vec![item(0, 2)]);
        let result = state.apply(&SelectionAction::Split { line_item: 9 });
        assert_eq!(result, Err(SettlementError::UnknownLineItem(9)));
    }

    #[test]
    fn submission_skips_unselected_items() {
        let mut state = SelectionState::new(vec![item(0, 2), item(1, 3)]);
        state
            .apply(&SelectionAction::AmountChange {
                line_item: 1,
                step: Step::Increment,
            })
            .unwrap();

        let payment = state.submission("ana", Utc::now());
        assert_eq!(payment.creator, "ana");
        assert_eq!(
            payment.line_items,
            vec![PaymentLine {
                line_item_ref: 1,
                amount: Decimal::ONE
            }]
        );
    }

    #[test]
    fn claimable_never_exceeds_what_is_left() {
        let mut selection = item(0, 1);
        selection.prior_amount = Decimal::ONE / Decimal::from(3);
        assert!(selection.prior_amount + selection.claimable() <= Decimal::ONE);

        selection.prior_amount = Decimal::TWO;
        assert_eq!(selection.claimable(), Decimal::ZERO);
        assert!(selection.is_fully_claimed());
    }
}
