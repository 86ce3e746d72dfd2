use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::shared::models::Role;
use crate::shared::state::AppState;

/// Verified identity of the caller, decoded from the bearer credential.
/// Handlers take this as an argument; there is no ambient session state.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|auth| {
            auth.strip_prefix("Bearer ")
                .or_else(|| auth.strip_prefix("bearer "))
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);

        let token = extract_bearer_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;
        let claims = state
            .tokens
            .verify(token)
            .map_err(|_| ApiError::Unauthenticated)?;

        let id = claims.user_id().map_err(|_| ApiError::Unauthenticated)?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| ApiError::Unauthenticated)?;

        Ok(CurrentUser {
            id,
            username: claims.username,
            email: claims.email,
            full_name: claims.full_name,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(extract_bearer_token(&headers), Some("abc123"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("bearer abc123"),
        );
        assert_eq!(extract_bearer_token(&headers), Some("abc123"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc123"),
        );
        assert_eq!(extract_bearer_token(&headers), None);

        headers.remove(header::AUTHORIZATION);
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
