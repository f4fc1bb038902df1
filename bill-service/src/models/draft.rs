//! Editable bill as it comes out of receipt scanning, before it is shared.

use super::bill::{LineItem, NewBill, MAX_PRICE, MAX_QUANTITY};
use crate::settlement::money::{update_price, update_quantity};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;

pub const SERVICE_FEE_DESCRIPTION: &str = "Service fee";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("A bill needs at least one line item")]
    NoLineItems,

    #[error("Line item {position} must have a positive quantity")]
    InvalidQuantity { position: usize },

    #[error("Line item {position} has a negative price")]
    NegativePrice { position: usize },

    #[error("Line item {position} quantity is larger than allowed")]
    QuantityTooLarge { position: usize },

    #[error("Line item {position} price is larger than allowed")]
    PriceTooLarge { position: usize },

    #[error("Service fee cannot be negative")]
    NegativeServiceFee,

    #[error("Service fee is larger than allowed")]
    ServiceFeeTooLarge,

    #[error("Invalid bill date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// A scanned line item together with whatever the user typed over it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DraftLineItem {
    pub description: String,
    pub amount: Decimal,
    pub total_price: Decimal,
    pub amount_input: Option<String>,
    pub total_price_input: Option<String>,
    pub is_deleted: bool,
}

impl DraftLineItem {
    /// Typed quantity if it parses, otherwise the scanned one.
    pub fn effective_amount(&self) -> Decimal {
        match &self.amount_input {
            Some(input) => update_quantity(self.amount, input),
            None => self.amount,
        }
    }

    /// Typed total price if it parses, otherwise the scanned one.
    pub fn effective_total_price(&self) -> Decimal {
        match &self.total_price_input {
            Some(input) => update_price(self.total_price, input),
            None => self.total_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BillDraft {
    pub name: String,
    /// `YYYY-MM-DD`, unpadded parts allowed. Missing means today.
    pub date: Option<String>,
    pub currency: String,
    pub service_fee: Option<Decimal>,
    pub service_fee_input: Option<String>,
    pub payment_method: String,
    pub line_items: Vec<DraftLineItem>,
}

impl BillDraft {
    fn kept_items(&self) -> impl Iterator<Item = &DraftLineItem> {
        self.line_items.iter().filter(|item| !item.is_deleted)
    }

    pub fn effective_service_fee(&self) -> Decimal {
        let fee = self.service_fee.unwrap_or(Decimal::ZERO);
        match &self.service_fee_input {
            Some(input) => update_price(fee, input),
            None => fee,
        }
    }

    /// Sum of kept items with a positive quantity, before the service fee.
    pub fn subtotal(&self) -> Decimal {
        self.kept_items()
            .filter(|item| item.effective_amount() > Decimal::ZERO)
            .map(DraftLineItem::effective_total_price)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Finalize the draft: drop deleted items, index the rest from zero and
    /// turn a positive service fee into its own line item.
    pub fn into_new_bill(self, share_code: String, today: NaiveDate) -> Result<NewBill, DraftError> {
        let date = match self.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                parse_bill_date(raw).ok_or_else(|| DraftError::InvalidDate(raw.to_string()))?
            }
            _ => today,
        };

        let service_fee = self.effective_service_fee();
        if service_fee < Decimal::ZERO {
            return Err(DraftError::NegativeServiceFee);
        }
        if service_fee > MAX_PRICE {
            return Err(DraftError::ServiceFeeTooLarge);
        }

        let mut line_items = Vec::new();
        for (position, item) in self.kept_items().enumerate() {
            let amount = item.effective_amount();
            let total_price = item.effective_total_price();
            if amount <= Decimal::ZERO {
                return Err(DraftError::InvalidQuantity { position });
            }
            if amount > MAX_QUANTITY {
                return Err(DraftError::QuantityTooLarge { position });
            }
            if total_price < Decimal::ZERO {
                return Err(DraftError::NegativePrice { position });
            }

            // A tiny quantity can still blow the unit price up past the limit.
            let unit_price = total_price
                .checked_div(amount)
                .filter(|price| total_price <= MAX_PRICE && *price <= MAX_PRICE)
                .ok_or(DraftError::PriceTooLarge { position })?;

            line_items.push(LineItem {
                index: position as i32,
                description: item.description.trim().to_string(),
                amount,
                unit_price,
            });
        }

        if service_fee > Decimal::ZERO {
            line_items.push(LineItem {
                index: line_items.len() as i32,
                description: SERVICE_FEE_DESCRIPTION.to_string(),
                amount: Decimal::ONE,
                unit_price: service_fee,
            });
        }

        if line_items.is_empty() {
            return Err(DraftError::NoLineItems);
        }

        Ok(NewBill {
            share_code,
            name: self.name.trim().to_string(),
            date,
            currency: self.currency,
            service_fee: (service_fee > Decimal::ZERO).then_some(service_fee),
            payment_method: self.payment_method.trim().to_string(),
            line_items,
        })
    }
}

/// Parse `Y-M-D`, accepting single-digit months and days.
pub fn parse_bill_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    NaiveDate::from_ymd_opt(
        year.trim().parse().ok()?,
        month.trim().parse().ok()?,
        day.trim().parse().ok()?,
    )
}
