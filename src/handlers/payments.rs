use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::commerce::payment,
    handlers::common::ensure_staff,
    services::payments::{FailPaymentRequest, RefundOutcome, RefundRequest},
    ApiResponse, ApiResult, AppState,
};

/// Payment back-office endpoints; payments are simulated, so staff drive failures.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/{id}", get(get_payment))
        .route("/payments/{id}/fail", post(fail_payment))
        .route("/payments/{id}/refund", post(refund_payment))
}

async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<payment::Model> {
    ensure_staff(&user)?;
    let payment = state.services.payments.get_payment(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

async fn fail_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<FailPaymentRequest>,
) -> ApiResult<payment::Model> {
    ensure_staff(&user)?;
    let payment = state.services.payments.fail_payment(id, payload).await?;
    Ok(Json(ApiResponse::success(payment)))
}

async fn refund_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RefundRequest>,
) -> ApiResult<RefundOutcome> {
    ensure_staff(&user)?;
    let outcome = state.services.payments.process_refund(id, payload).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
