use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::commerce::purchase_history,
    errors::ServiceError,
    handlers::common::created_response,
    services::purchases::PurchaseReceipt,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize)]
struct LegacyPurchaseRequest {
    factory_id: Uuid,
}

pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/purchases", get(history))
        .route("/purchases/legacy", post(start_legacy_purchase))
        .route(
            "/purchases/legacy/{id}/complete",
            post(complete_legacy_purchase),
        )
}

async fn history(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<purchase_history::Model>> {
    let history = state
        .services
        .purchases
        .purchase_history(user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

async fn start_legacy_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<LegacyPurchaseRequest>,
) -> Result<Response, ServiceError> {
    let purchase = state
        .services
        .purchases
        .process_legacy_purchase(user.user_id, payload.factory_id)
        .await?;
    Ok(created_response(purchase))
}

async fn complete_legacy_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<PurchaseReceipt> {
    let receipt = state
        .services
        .purchases
        .complete_legacy_purchase(user.user_id, id)
        .await?;
    Ok(Json(ApiResponse::success(receipt)))
}
