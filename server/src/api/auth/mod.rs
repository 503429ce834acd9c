//! Request authentication: JWT sessions for the dashboard, API keys for
//! ingest

pub mod api_key;
pub mod jwt;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ApiError;
use crate::data::Store;

pub use api_key::{ApiKeyAuthState, IngestProject, require_api_key};

/// State for the dashboard auth middleware
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<Store>,
    pub jwt_secret: Vec<u8>,
}

/// Authenticated dashboard user, injected into request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

/// Require a valid JWT bearer on dashboard routes
pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

    let claims = jwt::validate_session_token(token, &state.jwt_secret)
        .map_err(|_| ApiError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email,
    });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"test-jwt-secret-32-bytes-long!!!";

    async fn app() -> Router {
        let store = Arc::new(Store::init("sqlite::memory:").await.unwrap());
        let state = AuthState {
            store,
            jwt_secret: SECRET.to_vec(),
        };
        Router::new()
            .route(
                "/me",
                get(|Extension(user): Extension<AuthUser>| async move { user.email }),
            )
            .layer(axum::middleware::from_fn_with_state(state, require_auth))
    }

    #[tokio::test]
    async fn test_valid_token_passes() {
        let token = jwt::create_session_token(SECRET, "u1", "dev@example.com", 24).unwrap();
        let response = app()
            .await
            .oneshot(
                HttpRequest::builder()
                    .uri("/me")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let response = app()
            .await
            .oneshot(HttpRequest::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_token_is_401() {
        let response = app()
            .await
            .oneshot(
                HttpRequest::builder()
                    .uri("/me")
                    .header("authorization", "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
