use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::taxonomy::{category, sub_category},
    errors::ServiceError,
    handlers::common::{created_response, ensure_staff, message_response},
    services::categories::{
        CategorySummary, CreateCategoryRequest, CreateSubCategoryRequest, UpdateCategoryRequest,
        UpdateSubCategoryRequest,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize)]
struct CategoryListQuery {
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SubCategoryListQuery {
    category_id: Option<Uuid>,
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/categories/{id}/subcategories", get(subcategories_of))
        .route(
            "/subcategories",
            get(list_subcategories).post(create_subcategory),
        )
        .route(
            "/subcategories/{id}",
            get(get_subcategory)
                .put(update_subcategory)
                .delete(delete_subcategory),
        )
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> ApiResult<Vec<CategorySummary>> {
    let categories = state
        .services
        .categories
        .list_categories(query.include_inactive)
        .await?;
    Ok(Json(ApiResponse::success(categories)))
}

async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let category = state.services.categories.create_category(payload).await?;
    Ok(created_response(category))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<category::Model> {
    let category = state.services.categories.get_category(id).await?;
    Ok(Json(ApiResponse::success(category)))
}

async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<category::Model> {
    ensure_staff(&user)?;
    let category = state
        .services
        .categories
        .update_category(id, payload)
        .await?;
    Ok(Json(ApiResponse::success(category)))
}

async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.categories.delete_category(id).await?;
    Ok(message_response("Category deleted"))
}

async fn subcategories_of(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<sub_category::Model>> {
    let subcategories = state.services.categories.subcategories_of(id).await?;
    Ok(Json(ApiResponse::success(subcategories)))
}

async fn list_subcategories(
    State(state): State<AppState>,
    Query(query): Query<SubCategoryListQuery>,
) -> ApiResult<Vec<sub_category::Model>> {
    let subcategories = state
        .services
        .categories
        .list_subcategories(query.category_id)
        .await?;
    Ok(Json(ApiResponse::success(subcategories)))
}

async fn create_subcategory(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSubCategoryRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let subcategory = state
        .services
        .categories
        .create_subcategory(payload)
        .await?;
    Ok(created_response(subcategory))
}

async fn get_subcategory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<sub_category::Model> {
    let subcategory = state.services.categories.get_subcategory(id).await?;
    Ok(Json(ApiResponse::success(subcategory)))
}

async fn update_subcategory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubCategoryRequest>,
) -> ApiResult<sub_category::Model> {
    ensure_staff(&user)?;
    let subcategory = state
        .services
        .categories
        .update_subcategory(id, payload)
        .await?;
    Ok(Json(ApiResponse::success(subcategory)))
}

async fn delete_subcategory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.categories.delete_subcategory(id).await?;
    Ok(message_response("Subcategory deleted"))
}
