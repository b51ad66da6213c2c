use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::commerce::cart_item,
    errors::ServiceError,
    handlers::common::{created_response, message_response},
    services::cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
    ApiResponse, ApiResult, AppState,
};

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(view_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route(
            "/cart/items/{factory_id}",
            put(update_item).delete(remove_item),
        )
}

async fn view_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<CartView> {
    let cart = state.services.cart.view(user.user_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<()> {
    let removed = state.services.cart.clear(user.user_id).await?;
    Ok(message_response(format!("Removed {} item(s)", removed)))
}

async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> Result<Response, ServiceError> {
    let item = state.services.cart.add_item(user.user_id, payload).await?;
    Ok(created_response(item))
}

async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(factory_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> ApiResult<cart_item::Model> {
    let item = state
        .services
        .cart
        .update_quantity(user.user_id, factory_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(factory_id): Path<Uuid>,
) -> ApiResult<()> {
    state
        .services
        .cart
        .remove_item(user.user_id, factory_id)
        .await?;
    Ok(message_response("Item removed"))
}
