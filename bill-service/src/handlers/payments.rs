//! Recording, viewing and removing payments on a bill.

use super::track;
use crate::dtos::{CreatePaymentRequest, PaymentCreatedResponse, PaymentReceiptResponse};
use crate::models::NewPayment;
use crate::services::{record_payment, record_payment_removed};
use crate::settlement::aggregate::payment_value;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::middleware::RequestId;
use validator::Validate;

fn outcome(result: &Result<impl Sized, AppError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AppError::Conflict(_) | AppError::BadRequest(_) | AppError::ValidationError(_)) => {
            "rejected"
        }
        Err(_) => "error",
    }
}

/// Append the participant's claim to the bill's payment log.
pub async fn create_payment(
    State(state): State<AppState>,
    Path(share_code): Path<String>,
    request_id: RequestId,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentCreatedResponse>), AppError> {
    let result = async {
        payload.validate()?;

        let creator = payload.creator.trim().to_string();
        if creator.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Creator name is required")));
        }

        // Unit prices never change, so the bill loaded here prices the new record.
        let bill = state.store.load_bill(&share_code).await?;
        let payment = NewPayment {
            creator,
            created_on: Utc::now(),
            line_items: payload.line_items.into_iter().map(Into::into).collect(),
        };
        let record = state.store.append_payment(&share_code, payment).await?;
        let paid_amount = payment_value(&bill, &record);

        tracing::info!(
            request_id = %request_id.0,
            share_code = %share_code,
            payment_id = %record.id,
            line_count = record.line_items.len(),
            paid_amount = %paid_amount,
            "Payment recorded"
        );

        Ok::<_, AppError>((
            StatusCode::CREATED,
            Json(PaymentCreatedResponse {
                payment_id: record.id,
                paid_amount: paid_amount.normalize(),
                currency: bill.currency,
            }),
        ))
    }
    .await;

    record_payment(outcome(&result));
    if let Err(ref e) = result {
        tracing::warn!(share_code = %share_code, error = %e, "Payment rejected");
    }
    track(result)
}

/// Receipt for one payment, including how to pay the bill owner.
pub async fn get_payment(
    State(state): State<AppState>,
    Path((share_code, payment_id)): Path<(String, String)>,
) -> Result<Json<PaymentReceiptResponse>, AppError> {
    let bill = track(state.store.load_bill(&share_code).await)?;
    let payment = track(bill.payment(&payment_id).ok_or_else(|| {
        AppError::NotFound(anyhow::anyhow!("Payment '{}' not found", payment_id))
    }))?;

    Ok(Json(PaymentReceiptResponse::new(&bill, payment)))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Path((share_code, payment_id)): Path<(String, String)>,
    request_id: RequestId,
) -> Result<StatusCode, AppError> {
    let result = state.store.remove_payment(&share_code, &payment_id).await;
    record_payment_removed(outcome(&result));
    track(result)?;

    tracing::info!(
        request_id = %request_id.0,
        share_code = %share_code,
        payment_id = %payment_id,
        "Payment removed"
    );

    Ok(StatusCode::NO_CONTENT)
}
