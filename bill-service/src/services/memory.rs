//! Process-local bill store, used for development and tests.

use super::store::{bill_not_found, payment_not_found, BillStore};
use crate::models::{Bill, NewBill, NewPayment, PaymentRecord};
use crate::settlement::{claimed_amounts, validate_claims};
use crate::utils::random_code;
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryBillStore {
    bills: Arc<RwLock<HashMap<String, Bill>>>,
}

impl InMemoryBillStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BillStore for InMemoryBillStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    #[instrument(skip(self, bill), fields(share_code = %bill.share_code))]
    async fn create_bill(&self, bill: NewBill) -> Result<Bill, AppError> {
        let mut bills = self.bills.write().await;
        if bills.contains_key(&bill.share_code) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Bill '{}' already exists",
                bill.share_code
            )));
        }

        let created = Bill {
            id: Uuid::new_v4(),
            share_code: bill.share_code,
            name: bill.name,
            date: bill.date,
            currency: bill.currency,
            service_fee: bill.service_fee,
            payment_method: bill.payment_method,
            created_on: Utc::now(),
            number_of_payments: 0,
            line_items: bill.line_items,
            payment_items: Vec::new(),
        };
        bills.insert(created.share_code.clone(), created.clone());

        info!(bill_id = %created.id, item_count = created.line_items.len(), "Bill stored");
        Ok(created)
    }

    async fn load_bill(&self, share_code: &str) -> Result<Bill, AppError> {
        self.bills
            .read()
            .await
            .get(share_code)
            .cloned()
            .ok_or_else(|| bill_not_found(share_code))
    }

    #[instrument(skip(self, payment), fields(share_code = %share_code, line_count = payment.line_items.len()))]
    async fn append_payment(
        &self,
        share_code: &str,
        payment: NewPayment,
    ) -> Result<PaymentRecord, AppError> {
        let mut bills = self.bills.write().await;
        let bill = bills
            .get_mut(share_code)
            .ok_or_else(|| bill_not_found(share_code))?;

        validate_claims(&bill.line_items, &claimed_amounts(bill), &payment.line_items)?;

        let record = PaymentRecord {
            id: random_code(),
            creator: payment.creator,
            created_on: payment.created_on,
            line_items: payment.line_items,
        };
        bill.payment_items.push(record.clone());
        bill.number_of_payments += 1;

        info!(payment_id = %record.id, "Payment appended");
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn remove_payment(&self, share_code: &str, payment_id: &str) -> Result<(), AppError> {
        let mut bills = self.bills.write().await;
        let bill = bills
            .get_mut(share_code)
            .ok_or_else(|| bill_not_found(share_code))?;

        let position = bill
            .payment_items
            .iter()
            .position(|p| p.id == payment_id)
            .ok_or_else(|| payment_not_found(payment_id))?;
        bill.payment_items.remove(position);
        bill.number_of_payments -= 1;

        info!("Payment removed");
        Ok(())
    }
}
