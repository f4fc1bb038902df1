//! Bill creation, the shared bill view and selection replay.

use super::track;
use crate::dtos::{
    BillResponse, BillViewResponse, CreateBillRequest, PaymentSummaryResponse, SelectionRequest,
    SelectionResponse,
};
use crate::models::BillDraft;
use crate::services::{record_bill_created, record_selection_action};
use crate::settlement::derive_selection_state;
use crate::utils::random_code;
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

/// Finalize an edited draft into a shareable bill.
pub async fn create_bill(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(payload): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<BillResponse>), AppError> {
    let result = async {
        payload.validate()?;

        let draft = BillDraft::from(payload);
        let new_bill = draft.into_new_bill(random_code(), Utc::now().date_naive())?;
        let bill = state.store.create_bill(new_bill).await?;

        tracing::info!(
            request_id = %request_id.0,
            share_code = %bill.share_code,
            item_count = bill.line_items.len(),
            "Bill created"
        );

        Ok::<_, AppError>((StatusCode::CREATED, Json(BillResponse::from(&bill))))
    }
    .await;

    record_bill_created(if result.is_ok() { "ok" } else { "error" });
    track(result)
}

/// Open a shared bill: the bill, a fresh selection and the payment list.
pub async fn get_bill(
    State(state): State<AppState>,
    Path(share_code): Path<String>,
) -> Result<Json<BillViewResponse>, AppError> {
    let bill = track(state.store.load_bill(&share_code).await)?;
    let selection = derive_selection_state(&bill);

    tracing::debug!(
        share_code = %share_code,
        payment_count = bill.payment_items.len(),
        "Bill loaded"
    );

    Ok(Json(BillViewResponse {
        bill: BillResponse::from(&bill),
        selection: SelectionResponse::new(&bill, &selection),
        payments: bill
            .payment_items
            .iter()
            .map(|payment| PaymentSummaryResponse::new(&bill, payment))
            .collect(),
    }))
}

/// Replay a participant's taps on top of the current ledger.
pub async fn replay_selection(
    State(state): State<AppState>,
    Path(share_code): Path<String>,
    Json(payload): Json<SelectionRequest>,
) -> Result<Json<SelectionResponse>, AppError> {
    track(payload.validate().map_err(AppError::from))?;

    let bill = track(state.store.load_bill(&share_code).await)?;
    let mut selection = derive_selection_state(&bill);

    for action in &payload.actions {
        track(selection.apply(action).map_err(AppError::from))?;
        record_selection_action(action.kind());
    }

    tracing::debug!(
        share_code = %share_code,
        action_count = payload.actions.len(),
        "Selection replayed"
    );

    Ok(Json(SelectionResponse::new(&bill, &selection)))
}
