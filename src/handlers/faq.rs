use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::content::{faq_feedback, faq_question},
    errors::ServiceError,
    handlers::common::{created_response, ensure_staff, message_response, visitor},
    services::faq::{
        FaqCategoryCount, FaqQuestionView, FaqRequest, FaqSearchQuery, FaqStatistics,
        FeedbackRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Default, Deserialize)]
struct FaqListQuery {
    category_id: Option<Uuid>,
}

pub fn faq_routes() -> Router<AppState> {
    Router::new()
        .route("/faq", get(list_questions).post(create_question))
        .route("/faq/featured", get(featured))
        .route("/faq/categories", get(categories))
        .route("/faq/search", get(search))
        .route("/faq/statistics", get(statistics))
        .route(
            "/faq/{slug}",
            get(view_question).put(update_question).delete(delete_question),
        )
        .route("/faq/{slug}/publish", post(publish_question))
        .route("/faq/{slug}/archive", post(archive_question))
        .route("/faq/{slug}/feedback", post(submit_feedback))
}

async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<FaqListQuery>,
) -> ApiResult<Vec<faq_question::Model>> {
    let questions = state.services.faq.list_published(query.category_id).await?;
    Ok(Json(ApiResponse::success(questions)))
}

async fn featured(State(state): State<AppState>) -> ApiResult<Vec<faq_question::Model>> {
    let questions = state.services.faq.featured().await?;
    Ok(Json(ApiResponse::success(questions)))
}

async fn categories(State(state): State<AppState>) -> ApiResult<Vec<FaqCategoryCount>> {
    let counts = state.services.faq.categories_with_counts().await?;
    Ok(Json(ApiResponse::success(counts)))
}

async fn search(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    headers: HeaderMap,
    Query(params): Query<FaqSearchQuery>,
) -> ApiResult<PaginatedResponse<faq_question::Model>> {
    let visitor = visitor(user.as_ref(), &headers);
    let results = state.services.faq.search(params, &visitor).await?;
    Ok(Json(ApiResponse::success(results)))
}

async fn statistics(State(state): State<AppState>, user: AuthUser) -> ApiResult<FaqStatistics> {
    ensure_staff(&user)?;
    let stats = state.services.faq.statistics().await?;
    Ok(Json(ApiResponse::success(stats)))
}

async fn create_question(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<FaqRequest>,
) -> Result<Response, ServiceError> {
    ensure_staff(&user)?;
    let question = state
        .services
        .faq
        .create_question(Some(user.user_id), payload)
        .await?;
    Ok(created_response(question))
}

async fn view_question(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<FaqQuestionView> {
    let view = state.services.faq.view_question(&slug).await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn update_question(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<FaqRequest>,
) -> ApiResult<faq_question::Model> {
    ensure_staff(&user)?;
    let question = state
        .services
        .faq
        .update_question(Some(user.user_id), &slug, payload)
        .await?;
    Ok(Json(ApiResponse::success(question)))
}

async fn delete_question(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<()> {
    ensure_staff(&user)?;
    state.services.faq.delete_question(&slug).await?;
    Ok(message_response("Question deleted"))
}

async fn publish_question(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<faq_question::Model> {
    ensure_staff(&user)?;
    let question = state.services.faq.publish(&slug).await?;
    Ok(Json(ApiResponse::success(question)))
}

async fn archive_question(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<faq_question::Model> {
    ensure_staff(&user)?;
    let question = state.services.faq.archive(&slug).await?;
    Ok(Json(ApiResponse::success(question)))
}

async fn submit_feedback(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Response, ServiceError> {
    let visitor = visitor(user.as_ref(), &headers);
    let feedback: faq_feedback::Model = state
        .services
        .faq
        .submit_feedback(&slug, payload, &visitor)
        .await?;
    Ok(created_response(feedback))
}
