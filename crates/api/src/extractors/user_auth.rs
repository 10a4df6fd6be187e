//! Caller identity extractor.
//!
//! Authentication happens upstream; the gateway forwards the verified caller
//! in the `X-User-Id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated caller id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserAuth {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for UserAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;

        let user_id = Uuid::parse_str(value.trim())
            .map_err(|_| ApiError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER)))?;

        Ok(UserAuth { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;

    async fn extract(header: Option<&str>) -> Result<UserAuth, ApiError> {
        let mut builder = Request::builder().uri("/api/v1/visibility");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        UserAuth::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_header() {
        let id = Uuid::new_v4();
        let auth = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(auth.user_id, id);
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let err = extract(None).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthorized() {
        let err = extract(Some("not-a-uuid")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(msg) if msg.contains("Invalid")));
    }
}
