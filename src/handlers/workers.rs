use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::{work_experience, worker},
    errors::ServiceError,
    handlers::common::{created_response, message_response},
    services::workers::{ExperienceRequest, WorkerFilter, WorkerProfile, WorkerRequest},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

pub fn worker_routes() -> Router<AppState> {
    Router::new()
        .route("/workers", get(list_workers).post(register_worker))
        .route(
            "/workers/{slug}",
            get(get_worker).put(update_worker).delete(delete_worker),
        )
        .route("/workers/{slug}/experiences", post(add_experience))
        .route(
            "/experiences/{id}",
            put(update_experience).delete(delete_experience),
        )
}

async fn list_workers(
    State(state): State<AppState>,
    Query(filter): Query<WorkerFilter>,
) -> ApiResult<PaginatedResponse<worker::Model>> {
    let page = state.services.workers.list_workers(filter).await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn register_worker(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<WorkerRequest>,
) -> Result<Response, ServiceError> {
    let worker = state
        .services
        .workers
        .register_worker(Some(user.user_id), payload)
        .await?;
    Ok(created_response(worker))
}

async fn get_worker(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<WorkerProfile> {
    let profile = state.services.workers.profile(&slug).await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn update_worker(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<WorkerRequest>,
) -> ApiResult<worker::Model> {
    let worker = state
        .services
        .workers
        .update_worker(user.actor(), &slug, payload)
        .await?;
    Ok(Json(ApiResponse::success(worker)))
}

async fn delete_worker(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<()> {
    state
        .services
        .workers
        .delete_worker(user.actor(), &slug)
        .await?;
    Ok(message_response("Worker deleted"))
}

async fn add_experience(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<ExperienceRequest>,
) -> Result<Response, ServiceError> {
    let experience = state
        .services
        .workers
        .add_experience(user.actor(), &slug, payload)
        .await?;
    Ok(created_response(experience))
}

async fn update_experience(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExperienceRequest>,
) -> ApiResult<work_experience::Model> {
    let experience = state
        .services
        .workers
        .update_experience(user.actor(), id, payload)
        .await?;
    Ok(Json(ApiResponse::success(experience)))
}

async fn delete_experience(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state
        .services
        .workers
        .delete_experience(user.actor(), id)
        .await?;
    Ok(message_response("Experience deleted"))
}
