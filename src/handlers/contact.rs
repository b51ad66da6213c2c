use axum::{extract::State, response::Response, routing::post, Json, Router};

use crate::{
    auth::AuthUser, errors::ServiceError, handlers::common::created_response,
    services::contact::ContactRequest, AppState,
};

/// Public contact form. Signed-in senders are linked to their account.
pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact", post(submit))
}

async fn submit(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<ContactRequest>,
) -> Result<Response, ServiceError> {
    let message = state
        .services
        .contact
        .submit(user.map(|u| u.user_id), payload)
        .await?;
    Ok(created_response(message))
}
