use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    auth::AuthUser,
    entities::factory,
    errors::ServiceError,
    handlers::common::{created_response, ensure_staff, message_response},
    services::factories::{FactoryDashboard, FactoryFilter, FactoryRequest},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Factory page payload.
#[derive(Debug, Serialize)]
pub struct FactoryPage {
    #[serde(flatten)]
    pub factory: factory::Model,
    pub full_address: String,
    /// Only present for signed-in visitors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased: Option<bool>,
}

pub fn factory_routes() -> Router<AppState> {
    Router::new()
        .route("/factories", get(list_factories).post(create_factory))
        .route("/factories/dashboard", get(dashboard))
        .route(
            "/factories/{slug}",
            get(get_factory).put(update_factory).delete(delete_factory),
        )
        .route("/factories/{slug}/related", get(related_factories))
        .route("/factories/{slug}/toggle-active", post(toggle_active))
        .route("/factories/{slug}/toggle-verified", post(toggle_verified))
}

async fn list_factories(
    State(state): State<AppState>,
    Query(filter): Query<FactoryFilter>,
) -> ApiResult<PaginatedResponse<factory::Model>> {
    let page = state.services.factories.list_factories(filter).await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn create_factory(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<FactoryRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let factory = state.services.factories.create_factory(payload).await?;
    Ok(created_response(factory))
}

async fn get_factory(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(slug): Path<String>,
) -> ApiResult<FactoryPage> {
    let factories = &state.services.factories;
    let factory = factories.get_by_slug(&slug).await?;
    let full_address = factories.full_address(&factory).await?;
    let purchased = match user {
        Some(user) => Some(
            state
                .services
                .purchases
                .has_purchased(user.user_id, factory.id)
                .await?,
        ),
        None => None,
    };
    Ok(Json(ApiResponse::success(FactoryPage {
        factory,
        full_address,
        purchased,
    })))
}

async fn update_factory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<FactoryRequest>,
) -> ApiResult<factory::Model> {
    ensure_staff(&user)?;
    let factory = state
        .services
        .factories
        .update_factory(&slug, payload)
        .await?;
    Ok(Json(ApiResponse::success(factory)))
}

async fn delete_factory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.factories.delete_factory(&slug).await?;
    Ok(message_response("Factory deleted"))
}

async fn related_factories(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Vec<factory::Model>> {
    let related = state.services.factories.related_factories(&slug).await?;
    Ok(Json(ApiResponse::success(related)))
}

async fn toggle_active(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<factory::Model> {
    ensure_staff(&user)?;
    let factory = state.services.factories.toggle_active(&slug).await?;
    Ok(Json(ApiResponse::success(factory)))
}

async fn toggle_verified(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<factory::Model> {
    ensure_staff(&user)?;
    let factory = state.services.factories.toggle_verified(&slug).await?;
    Ok(Json(ApiResponse::success(factory)))
}

async fn dashboard(State(state): State<AppState>, user: AuthUser) -> ApiResult<FactoryDashboard> {
    ensure_staff(&user)?;
    let dashboard = state.services.factories.dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard)))
}
