//! Bill aggregate: line items plus the append-only payment log.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Largest quantity a line item or a single payment line may carry.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Largest total price, unit price or service fee accepted on a bill.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// One purchasable unit group on the receipt. Immutable once the bill is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    #[sqlx(rename = "item_index")]
    pub index: i32,
    pub description: String,
    /// Quantity, possibly fractional.
    pub amount: Decimal,
    pub unit_price: Decimal,
}

impl LineItem {
    /// Full value of the item (`amount * unit_price`), saturating at [`Decimal::MAX`].
    pub fn total_price(&self) -> Decimal {
        self.amount.saturating_mul(self.unit_price)
    }
}

/// A quantity of one line item claimed by a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLine {
    pub line_item_ref: i32,
    pub amount: Decimal,
}

/// A participant's recorded claim against the bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub creator: String,
    pub created_on: DateTime<Utc>,
    pub line_items: Vec<PaymentLine>,
}

/// Payment record before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub creator: String,
    pub created_on: DateTime<Utc>,
    pub line_items: Vec<PaymentLine>,
}

/// Finalized, shareable bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub share_code: String,
    pub name: String,
    pub date: NaiveDate,
    pub currency: String,
    pub service_fee: Option<Decimal>,
    pub payment_method: String,
    pub created_on: DateTime<Utc>,
    pub number_of_payments: i32,
    pub line_items: Vec<LineItem>,
    pub payment_items: Vec<PaymentRecord>,
}

impl Bill {
    /// Look up a line item by its index.
    pub fn line_item(&self, index: i32) -> Option<&LineItem> {
        self.line_items.iter().find(|item| item.index == index)
    }

    /// Look up a payment record by its id.
    pub fn payment(&self, payment_id: &str) -> Option<&PaymentRecord> {
        self.payment_items.iter().find(|p| p.id == payment_id)
    }
}

/// Input for creating a bill, produced from an edited draft.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    pub share_code: String,
    pub name: String,
    pub date: NaiveDate,
    pub currency: String,
    pub service_fee: Option<Decimal>,
    pub payment_method: String,
    pub line_items: Vec<LineItem>,
}

/// Bill header row as stored in PostgreSQL.
#[derive(Debug, Clone, FromRow)]
pub struct BillRow {
    pub bill_id: Uuid,
    pub share_code: String,
    pub name: String,
    pub bill_date: NaiveDate,
    pub currency: String,
    pub service_fee: Option<Decimal>,
    pub payment_method: String,
    pub created_utc: DateTime<Utc>,
    pub number_of_payments: i32,
}

impl BillRow {
    /// Assemble the aggregate from its header, items and payments.
    pub fn into_bill(self, line_items: Vec<LineItem>, payment_items: Vec<PaymentRecord>) -> Bill {
        Bill {
            id: self.bill_id,
            share_code: self.share_code,
            name: self.name,
            date: self.bill_date,
            currency: self.currency,
            service_fee: self.service_fee,
            payment_method: self.payment_method,
            created_on: self.created_utc,
            number_of_payments: self.number_of_payments,
            line_items,
            payment_items,
        }
    }
}
