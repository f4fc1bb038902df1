//! Settlement engine: who has claimed what on a bill, and what is left.
//!
//! Everything in here is pure. The ledger is rebuilt from a [`Bill`] with
//! [`derive_selection_state`], the participant's choices are applied through
//! [`SelectionState::apply`], and [`Totals::compute`] reports the split.
//!
//! [`Bill`]: crate::models::Bill

pub mod aggregate;
pub mod allocation;
pub mod ledger;
pub mod money;
pub mod selection;

pub use aggregate::Totals;
pub use ledger::{claimed_amounts, derive_selection_state, validate_claims};
pub use money::ParsedNumber;
pub use selection::{
    Allocation, Contribution, ItemSelection, Mode, SelectionAction, SelectionState, Step,
};

use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Line item {0} does not exist on this bill")]
    UnknownLineItem(i32),

    #[error("Line item {line_item} is over-claimed: requested {requested}, available {available}")]
    OverClaimed {
        line_item: i32,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Payment must claim at least one line item")]
    EmptyPayment,

    #[error("Claimed amount for line item {0} must be positive")]
    NonPositiveAmount(i32),
}

impl SettlementError {
    pub fn kind(&self) -> &'static str {
        match self {
            SettlementError::UnknownLineItem(_) => "unknown_line_item",
            SettlementError::OverClaimed { .. } => "over_claimed",
            SettlementError::EmptyPayment => "empty_payment",
            SettlementError::NonPositiveAmount(_) => "non_positive_amount",
        }
    }
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::OverClaimed { .. } => AppError::Conflict(anyhow::Error::new(err)),
            _ => AppError::BadRequest(anyhow::Error::new(err)),
        }
    }
}
