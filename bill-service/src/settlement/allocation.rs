//! Claim transitions for a single item: itemizing by quantity or splitting the total.
//!
//! Every transition is total. Values are clamped to `[0, claimable]` and
//! switching between modes starts the new mode from zero.

use super::money::round;
use super::selection::{Allocation, ItemSelection, Step};
use rust_decimal::{Decimal, RoundingStrategy};

/// Smallest number of ways an item is split on entry.
const MIN_SPLIT: u32 = 2;

/// Decimal places kept for a split share, truncated. Shares then add up
/// exactly, and the sub-grid leftover rounds to nothing claimable.
const SHARE_SCALE: u32 = 12;

fn clamp(value: Decimal, cap: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(cap)
}

impl ItemSelection {
    /// Claim one unit more or less of the item.
    pub fn amount_change(&mut self, step: Step) {
        let cap = self.claimable();
        let (current, remaining) = match self.allocation {
            Allocation::Itemizing { current, remaining } => (current, remaining),
            _ => (Decimal::ZERO, cap),
        };

        let delta = step.delta();
        let current = clamp(round(current + delta), cap);
        let remaining = clamp(round(remaining - delta), cap);

        self.allocation = if current.is_zero() {
            Allocation::Undecided
        } else {
            Allocation::Itemizing { current, remaining }
        };
    }

    /// Start splitting the item's quantity between the current payers and this one.
    pub fn split(&mut self) {
        let payers = u32::try_from(self.payment_items.len()).unwrap_or(u32::MAX);
        self.allocation = self.split_by(payers.max(MIN_SPLIT));
    }

    /// Split among one more or one fewer person. Only meaningful while splitting.
    pub fn split_change(&mut self, step: Step) {
        let Allocation::Splitting { denominator, .. } = self.allocation else {
            return;
        };

        let denominator = match step {
            Step::Increment => denominator.saturating_add(1),
            Step::Decrement => denominator.saturating_sub(1),
        };

        self.allocation = if denominator <= 1 {
            Allocation::Undecided
        } else {
            self.split_by(denominator)
        };
    }

    fn split_by(&self, denominator: u32) -> Allocation {
        let cap = self.claimable();
        let share = (self.line_item.amount / Decimal::from(denominator))
            .round_dp_with_strategy(SHARE_SCALE, RoundingStrategy::ToZero);
        let current = share.min(cap);
        Allocation::Splitting {
            denominator,
            current,
            remaining: cap - current,
        }
    }
}
