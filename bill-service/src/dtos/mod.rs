//! Request and response bodies for the bill HTTP API.
//!
//! Decimal quantities are serialized as strings in normalized form (`"1.5"`, not `"1.50"`).

use crate::models::{
    Bill, BillDraft, DraftLineItem, LineItem, PaymentLine, PaymentMethod, PaymentRecord, MAX_PRICE,
    MAX_QUANTITY,
};
use crate::settlement::aggregate::payment_value;
use crate::settlement::money::format_decimal;
use crate::settlement::{Contribution, ItemSelection, Mode, SelectionAction, SelectionState, Totals};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBillRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub date: Option<String>,
    #[validate(length(min = 1, max = 8))]
    pub currency: String,
    #[validate(custom(function = "validate_price"))]
    pub service_fee: Option<Decimal>,
    #[validate(length(max = 64))]
    pub service_fee_input: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub payment_method: String,
    #[validate(length(min = 1, max = 500))]
    #[validate(nested)]
    pub line_items: Vec<DraftLineItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DraftLineItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(custom(function = "validate_quantity"))]
    pub amount: Decimal,
    #[validate(custom(function = "validate_price"))]
    pub total_price: Decimal,
    #[validate(length(max = 64))]
    pub amount_input: Option<String>,
    #[validate(length(max = 64))]
    pub total_price_input: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl From<CreateBillRequest> for BillDraft {
    fn from(req: CreateBillRequest) -> Self {
        BillDraft {
            name: req.name,
            date: req.date,
            currency: req.currency,
            service_fee: req.service_fee,
            service_fee_input: req.service_fee_input,
            payment_method: req.payment_method,
            line_items: req
                .line_items
                .into_iter()
                .map(|item| DraftLineItem {
                    description: item.description,
                    amount: item.amount,
                    total_price: item.total_price,
                    amount_input: item.amount_input,
                    total_price_input: item.total_price_input,
                    is_deleted: item.is_deleted,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SelectionRequest {
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub actions: Vec<SelectionAction>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, max = 100))]
    pub creator: String,
    #[validate(length(min = 1, max = 500))]
    #[validate(nested)]
    pub line_items: Vec<PaymentLineRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PaymentLineRequest {
    pub line_item_ref: i32,
    #[validate(custom(function = "validate_quantity"))]
    pub amount: Decimal,
}

fn validate_quantity(value: &Decimal) -> Result<(), ValidationError> {
    if *value > MAX_QUANTITY {
        return Err(ValidationError::new("quantity_too_large"));
    }
    Ok(())
}

fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value > MAX_PRICE {
        return Err(ValidationError::new("price_too_large"));
    }
    Ok(())
}

impl From<PaymentLineRequest> for PaymentLine {
    fn from(line: PaymentLineRequest) -> Self {
        PaymentLine {
            line_item_ref: line.line_item_ref,
            amount: line.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub index: i32,
    pub description: String,
    pub amount: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            index: item.index,
            description: item.description.clone(),
            amount: item.amount.normalize(),
            unit_price: item.unit_price.normalize(),
            total_price: item.total_price().normalize(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BillResponse {
    pub share_code: String,
    pub name: String,
    pub date: NaiveDate,
    pub currency: String,
    pub service_fee: Option<Decimal>,
    pub payment_method: String,
    pub created_on: DateTime<Utc>,
    pub number_of_payments: i32,
    pub line_items: Vec<LineItemResponse>,
}

impl From<&Bill> for BillResponse {
    fn from(bill: &Bill) -> Self {
        Self {
            share_code: bill.share_code.clone(),
            name: bill.name.clone(),
            date: bill.date,
            currency: bill.currency.clone(),
            service_fee: bill.service_fee.map(|fee| fee.normalize()),
            payment_method: bill.payment_method.clone(),
            created_on: bill.created_on,
            number_of_payments: bill.number_of_payments,
            line_items: bill.line_items.iter().map(LineItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContributionResponse {
    pub creator: String,
    pub amount: Decimal,
}

impl From<&Contribution> for ContributionResponse {
    fn from(c: &Contribution) -> Self {
        Self {
            creator: c.creator.clone(),
            amount: c.amount.normalize(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemSelectionResponse {
    pub line_item: i32,
    pub description: String,
    pub amount: Decimal,
    pub unit_price: Decimal,
    pub prior_amount: Decimal,
    pub current_amount: Decimal,
    pub remaining_amount: Decimal,
    /// `remaining_amount` as a fraction, e.g. `"1 1/2"`.
    pub remaining_display: String,
    pub mode: Mode,
    pub splitting_denominator: Option<u32>,
    pub fully_claimed: bool,
    pub payment_items: Vec<ContributionResponse>,
}

impl From<&ItemSelection> for ItemSelectionResponse {
    fn from(item: &ItemSelection) -> Self {
        Self {
            line_item: item.index(),
            description: item.line_item.description.clone(),
            amount: item.line_item.amount.normalize(),
            unit_price: item.line_item.unit_price.normalize(),
            prior_amount: item.prior_amount.normalize(),
            current_amount: item.current_amount().normalize(),
            remaining_amount: item.remaining_amount().normalize(),
            remaining_display: format_decimal(item.remaining_amount()),
            mode: item.mode(),
            splitting_denominator: item.splitting_denominator(),
            fully_claimed: item.is_fully_claimed(),
            payment_items: item.payment_items.iter().map(ContributionResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    pub total: Decimal,
    pub paid: Decimal,
    pub current_share: Decimal,
    pub remaining: Decimal,
}

impl From<Totals> for TotalsResponse {
    fn from(totals: Totals) -> Self {
        Self {
            total: totals.total.normalize(),
            paid: totals.paid.normalize(),
            current_share: totals.current_share.normalize(),
            remaining: totals.remaining.normalize(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentLineResponse {
    pub line_item_ref: i32,
    pub description: Option<String>,
    pub amount: Decimal,
    pub amount_display: String,
}

impl PaymentLineResponse {
    fn new(bill: &Bill, line: &PaymentLine) -> Self {
        Self {
            line_item_ref: line.line_item_ref,
            description: bill
                .line_item(line.line_item_ref)
                .map(|item| item.description.clone()),
            amount: line.amount.normalize(),
            amount_display: format_decimal(line.amount),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub items: Vec<ItemSelectionResponse>,
    pub totals: TotalsResponse,
    /// Lines that would be submitted as the participant's payment.
    pub submission: Vec<PaymentLineResponse>,
}

impl SelectionResponse {
    pub fn new(bill: &Bill, state: &SelectionState) -> Self {
        Self {
            items: state.items().iter().map(ItemSelectionResponse::from).collect(),
            totals: Totals::compute(bill, state).into(),
            submission: state
                .payment_lines()
                .iter()
                .map(|line| PaymentLineResponse::new(bill, line))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentSummaryResponse {
    pub payment_id: String,
    pub creator: String,
    pub created_on: DateTime<Utc>,
    pub paid_amount: Decimal,
    pub line_items: Vec<PaymentLineResponse>,
}

impl PaymentSummaryResponse {
    pub fn new(bill: &Bill, payment: &PaymentRecord) -> Self {
        Self {
            payment_id: payment.id.clone(),
            creator: payment.creator.clone(),
            created_on: payment.created_on,
            paid_amount: payment_value(bill, payment).normalize(),
            line_items: payment
                .line_items
                .iter()
                .map(|line| PaymentLineResponse::new(bill, line))
                .collect(),
        }
    }
}

/// Everything a participant needs to open a shared bill.
#[derive(Debug, Serialize)]
pub struct BillViewResponse {
    pub bill: BillResponse,
    pub selection: SelectionResponse,
    pub payments: Vec<PaymentSummaryResponse>,
}

#[derive(Debug, Serialize)]
pub struct PaymentCreatedResponse {
    pub payment_id: String,
    pub paid_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentReceiptResponse {
    pub payment_id: String,
    pub bill_name: String,
    pub creator: String,
    pub created_on: DateTime<Utc>,
    pub paid_amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub line_items: Vec<PaymentLineResponse>,
}

impl PaymentReceiptResponse {
    pub fn new(bill: &Bill, payment: &PaymentRecord) -> Self {
        Self {
            payment_id: payment.id.clone(),
            bill_name: bill.name.clone(),
            creator: payment.creator.clone(),
            created_on: payment.created_on,
            paid_amount: payment_value(bill, payment).normalize(),
            currency: bill.currency.clone(),
            payment_method: PaymentMethod::parse(&bill.payment_method),
            line_items: payment
                .line_items
                .iter()
                .map(|line| PaymentLineResponse::new(bill, line))
                .collect(),
        }
    }
}
