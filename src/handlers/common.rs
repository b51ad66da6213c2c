use crate::services::faq::Visitor;
use crate::{auth::AuthUser, errors::ServiceError, ApiResponse, ResponseMeta};
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// 201 with the standard envelope
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// 200 envelope carrying only a message
pub fn message_response(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
        message: Some(message.into()),
        errors: None,
        meta: Some(ResponseMeta::capture()),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
}

fn default_page() -> u64 {
    1
}

/// Client address as reported by the proxy in front of us.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Catalogue writes are reserved for admin and staff accounts.
pub fn ensure_staff(user: &AuthUser) -> Result<(), ServiceError> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Staff access required".to_string()))
    }
}

pub fn visitor(user: Option<&AuthUser>, headers: &HeaderMap) -> Visitor {
    Visitor {
        user_id: user.map(|u| u.user_id),
        ip_address: client_ip(headers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_ip_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
