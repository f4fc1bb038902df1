use crate::models::{Bill, NewBill, NewPayment, PaymentRecord};
use async_trait::async_trait;
use service_core::error::AppError;

/// Persistence for bills and their payment logs.
///
/// `append_payment` must re-check the claim against the current log while
/// holding a lock on the bill, so that two participants working from the same
/// snapshot cannot together claim more than an item's quantity.
#[async_trait]
pub trait BillStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), AppError>;

    async fn create_bill(&self, bill: NewBill) -> Result<Bill, AppError>;

    /// Fails with `NotFound` for an unknown share code.
    async fn load_bill(&self, share_code: &str) -> Result<Bill, AppError>;

    async fn append_payment(
        &self,
        share_code: &str,
        payment: NewPayment,
    ) -> Result<PaymentRecord, AppError>;

    async fn remove_payment(&self, share_code: &str, payment_id: &str) -> Result<(), AppError>;
}

pub(crate) fn bill_not_found(share_code: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Bill '{}' not found", share_code))
}

pub(crate) fn payment_not_found(payment_id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Payment '{}' not found", payment_id))
}
