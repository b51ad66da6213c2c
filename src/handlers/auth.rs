use axum::{
    extract::State,
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use crate::{
    auth::{bearer_token, AuthUser},
    entities::user,
    errors::ServiceError,
    handlers::common::{created_response, message_response},
    services::accounts::{
        ChangePasswordRequest, ConfirmPasswordResetRequest, LoginRequest, LoginResponse,
        PasswordResetRequest, RegisterRequest, UpdateProfileRequest,
    },
    ApiResponse, ApiResult, AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me).put(update_me))
        .route("/password", post(change_password))
        .route("/password-reset", post(request_password_reset))
        .route("/password-reset/confirm", post(confirm_password_reset))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ServiceError> {
    let user = state.services.accounts.register(payload).await?;
    Ok(created_response(user))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = state.services.accounts.login(payload).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn logout(
    State(state): State<AppState>,
    _user: AuthUser,
    headers: HeaderMap,
) -> ApiResult<()> {
    let token = bearer_token(&headers).map_err(|e| ServiceError::Unauthorized(e.to_string()))?;
    state
        .auth
        .revoke_token(token)
        .await
        .map_err(|e| ServiceError::Unauthorized(e.to_string()))?;
    Ok(message_response("Logged out"))
}

async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<user::Model> {
    let profile = state.services.accounts.get_user(user.user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<user::Model> {
    let profile = state
        .services
        .accounts
        .update_profile(user.user_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    state
        .services
        .accounts
        .change_password(user.user_id, payload)
        .await?;
    Ok(message_response("Password changed"))
}

async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> ApiResult<()> {
    state
        .services
        .accounts
        .request_password_reset(payload)
        .await?;
    Ok(message_response(
        "If an account exists for that address, a reset token has been sent",
    ))
}

async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmPasswordResetRequest>,
) -> ApiResult<()> {
    state
        .services
        .accounts
        .confirm_password_reset(payload)
        .await?;
    Ok(message_response("Password has been reset"))
}
