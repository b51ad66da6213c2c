use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::commerce::{order, payment},
    errors::ServiceError,
    handlers::common::{created_response, PageQuery},
    services::orders::{CheckoutRequest, CompletionReport, OrderDetail},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/pay", post(process_payment))
        .route("/orders/{id}/complete", post(complete_payment))
        .route("/orders/{id}/cancel", post(cancel_order))
}

/// Turns the caller's cart into a pending order.
async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Response, ServiceError> {
    let order = state.services.orders.checkout(user.user_id, payload).await?;
    Ok(created_response(order))
}

async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<order::Model>> {
    let orders = state
        .services
        .orders
        .list_orders(user.user_id, query.page)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let order = state.services.orders.get_order(user.actor(), id).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn process_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<payment::Model> {
    let payment = state
        .services
        .orders
        .process_payment(user.actor(), id)
        .await?;
    Ok(Json(ApiResponse::success(payment)))
}

async fn complete_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<CompletionReport> {
    let report = state
        .services
        .orders
        .complete_payment(user.actor(), id)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<order::Model> {
    let order = state.services.orders.cancel_order(user.actor(), id).await?;
    Ok(Json(ApiResponse::success(order)))
}
