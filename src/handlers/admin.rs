use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::{admin_middleware, staff_middleware, AuthService, AuthUser},
    entities::commerce::order::{self, OrderStatus},
    entities::content::{blog_post, contact_message},
    entities::soft_delete::TrashEntry,
    entities::user::{self, UserRole},
    handlers::common::message_response,
    services::admin::{AdminDashboard, TrashKind},
    services::blog::BlogStatistics,
    services::contact::{ContactBulkRequest, ContactBulkResult, ContactFilter, ContactInbox},
    services::orders::{BulkOrderRequest, BulkOrderResult},
    services::purchases::MigrationReport,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Default, Deserialize)]
struct AdminOrderQuery {
    status: Option<OrderStatus>,
    #[serde(default = "first_page")]
    page: u64,
}

#[derive(Debug, Default, Deserialize)]
struct UserListQuery {
    #[serde(default = "first_page")]
    page: u64,
}

fn first_page() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
struct ChangeRoleRequest {
    role: UserRole,
}

#[derive(Debug, Default, Deserialize)]
struct MigrateQuery {
    #[serde(default)]
    dry_run: bool,
}

/// `/admin` routes. Everything needs staff; destructive and account routes need admin.
pub fn admin_routes(auth: Arc<AuthService>) -> Router<AppState> {
    let staff = Router::new()
        .route("/dashboard", get(dashboard))
        .route("/orders", get(list_orders))
        .route("/orders/bulk", post(bulk_orders))
        .route("/blog", get(list_posts))
        .route("/blog/statistics", get(blog_statistics))
        .route("/contacts", get(list_contacts))
        .route("/contacts/bulk", post(bulk_contacts))
        .route("/contacts/{id}", get(get_contact).delete(delete_contact))
        .route("/contacts/{id}/read", post(mark_contact_read))
        .route("/contacts/{id}/unread", post(mark_contact_unread))
        .route("/{entity}/deleted", get(list_deleted))
        .route("/{entity}/{id}/restore", post(restore))
        .route_layer(middleware::from_fn_with_state(
            auth.clone(),
            staff_middleware,
        ));

    let admin = Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(change_role))
        .route("/{entity}/{id}/hard-delete", delete(hard_delete))
        .route("/purchases/migrate", post(migrate_purchases))
        .route_layer(middleware::from_fn_with_state(auth, admin_middleware));

    staff.merge(admin)
}

async fn dashboard(State(state): State<AppState>) -> ApiResult<AdminDashboard> {
    let dashboard = state.services.admin.dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrderQuery>,
) -> ApiResult<PaginatedResponse<order::Model>> {
    let orders = state
        .services
        .orders
        .list_all_orders(query.status, query.page)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn bulk_orders(
    State(state): State<AppState>,
    Json(payload): Json<BulkOrderRequest>,
) -> ApiResult<BulkOrderResult> {
    let result = state.services.orders.bulk_action(payload).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn list_posts(State(state): State<AppState>) -> ApiResult<Vec<blog_post::Model>> {
    let posts = state.services.blog.list_all().await?;
    Ok(Json(ApiResponse::success(posts)))
}

async fn blog_statistics(State(state): State<AppState>) -> ApiResult<BlogStatistics> {
    let stats = state.services.blog.statistics().await?;
    Ok(Json(ApiResponse::success(stats)))
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(filter): Query<ContactFilter>,
) -> ApiResult<ContactInbox> {
    let inbox = state.services.contact.list(filter).await?;
    Ok(Json(ApiResponse::success(inbox)))
}

async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<contact_message::Model> {
    let message = state.services.contact.get(id).await?;
    Ok(Json(ApiResponse::success(message)))
}

async fn mark_contact_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<contact_message::Model> {
    let message = state.services.contact.set_read(id, true).await?;
    Ok(Json(ApiResponse::success(message)))
}

async fn mark_contact_unread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<contact_message::Model> {
    let message = state.services.contact.set_read(id, false).await?;
    Ok(Json(ApiResponse::success(message)))
}

async fn delete_contact(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    state.services.contact.delete(id).await?;
    Ok(message_response("Contact message deleted"))
}

async fn bulk_contacts(
    State(state): State<AppState>,
    Json(payload): Json<ContactBulkRequest>,
) -> ApiResult<ContactBulkResult> {
    let result = state.services.contact.bulk(payload).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn list_deleted(
    State(state): State<AppState>,
    Path(kind): Path<TrashKind>,
) -> ApiResult<Vec<TrashEntry>> {
    let entries = state.services.admin.list_deleted(kind).await?;
    Ok(Json(ApiResponse::success(entries)))
}

async fn restore(
    State(state): State<AppState>,
    Path((kind, id)): Path<(TrashKind, Uuid)>,
) -> ApiResult<()> {
    state.services.admin.restore(kind, id).await?;
    Ok(message_response(format!("{} restored", kind)))
}

async fn hard_delete(
    State(state): State<AppState>,
    Path((kind, id)): Path<(TrashKind, Uuid)>,
) -> ApiResult<()> {
    state.services.admin.hard_delete(kind, id).await?;
    Ok(message_response(format!("{} permanently deleted", kind)))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<PaginatedResponse<user::Model>> {
    let users = state.services.accounts.list_users(query.page).await?;
    Ok(Json(ApiResponse::success(users)))
}

async fn change_role(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> ApiResult<user::Model> {
    let user = state
        .services
        .accounts
        .change_role(admin.user_id, id, payload.role)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

async fn migrate_purchases(
    State(state): State<AppState>,
    Query(query): Query<MigrateQuery>,
) -> ApiResult<MigrationReport> {
    let report = state
        .services
        .purchases
        .migrate_purchases(query.dry_run)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}
