use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use crate::{
    auth::AuthUser,
    entities::content::blog_post,
    errors::ServiceError,
    handlers::common::{created_response, message_response},
    services::blog::{BlogFilter, BlogPostDetail, BlogPostRequest},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/blog", get(list_posts).post(create_post))
        .route(
            "/blog/{slug}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/blog/{slug}/publish", post(publish_post))
        .route("/blog/{slug}/unpublish", post(unpublish_post))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<BlogFilter>,
) -> ApiResult<PaginatedResponse<blog_post::Model>> {
    let posts = state.services.blog.list_published(filter).await?;
    Ok(Json(ApiResponse::success(posts)))
}

async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BlogPostRequest>,
) -> Result<Response, ServiceError> {
    let post = state
        .services
        .blog
        .create_post(user.user_id, payload)
        .await?;
    Ok(created_response(post))
}

async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<BlogPostDetail> {
    let post = state.services.blog.get_published(&slug).await?;
    Ok(Json(ApiResponse::success(post)))
}

async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<BlogPostRequest>,
) -> ApiResult<blog_post::Model> {
    let post = state
        .services
        .blog
        .update_post(user.actor(), &slug, payload)
        .await?;
    Ok(Json(ApiResponse::success(post)))
}

async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<()> {
    state.services.blog.delete_post(user.actor(), &slug).await?;
    Ok(message_response("Post deleted"))
}

async fn publish_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<blog_post::Model> {
    let post = state.services.blog.publish(user.actor(), &slug).await?;
    Ok(Json(ApiResponse::success(post)))
}

async fn unpublish_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<blog_post::Model> {
    let post = state.services.blog.unpublish(user.actor(), &slug).await?;
    Ok(Json(ApiResponse::success(post)))
}
