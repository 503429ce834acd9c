//! Project API-key authentication for the ingest route

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ApiError;
use crate::data::Store;
use crate::data::repositories::project;
use crate::utils::api_key::{extract_key_from_header, hash_api_key, is_valid_api_key};

/// State for the ingest auth middleware
#[derive(Clone)]
pub struct ApiKeyAuthState {
    pub store: Arc<Store>,
    pub api_key_secret: Vec<u8>,
}

/// Project resolved from a valid API key, injected into request extensions
#[derive(Debug, Clone)]
pub struct IngestProject {
    pub project_id: String,
}

/// Validate the bearer API key and resolve its project.
///
/// Every failure mode collapses to the same 401 so responses never reveal
/// whether a key exists. Keys are never logged beyond their display prefix.
pub async fn require_api_key(
    State(state): State<ApiKeyAuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let key = extract_key_from_header(header).ok_or(ApiError::Unauthorized)?;
    if !is_valid_api_key(&key) {
        return Err(ApiError::Unauthorized);
    }

    let key_hash = hash_api_key(&key, &state.api_key_secret);
    let project = project::get_project_by_api_key_hash(state.store.pool(), &key_hash)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "API key lookup failed");
            ApiError::Internal
        })?
        .ok_or(ApiError::Unauthorized)?;

    tracing::trace!(project_id = %project.id, key_prefix = %project.api_key_prefix, "Ingest authenticated");

    request.extensions_mut().insert(IngestProject {
        project_id: project.id,
    });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::post;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    use crate::data::repositories::project::create_project;
    use crate::data::repositories::user::create_user;
    use crate::utils::api_key::generate_api_key;

    const SECRET: &[u8] = b"test-api-key-secret-32-bytes!!!!";

    async fn app_with_key() -> (Router, String) {
        let store = Arc::new(Store::init("sqlite::memory:").await.unwrap());
        create_user(store.pool(), "dev@example.com", "x", None)
            .await
            .unwrap();

        let key = generate_api_key();
        let hash = hash_api_key(&key, SECRET);
        create_project(store.pool(), "P1", "dev@example.com", &hash, "le_test")
            .await
            .unwrap();

        let state = ApiKeyAuthState {
            store,
            api_key_secret: SECRET.to_vec(),
        };
        let app = Router::new()
            .route(
                "/ingest",
                post(|Extension(project): Extension<IngestProject>| async move {
                    project.project_id
                }),
            )
            .layer(axum::middleware::from_fn_with_state(state, require_api_key));

        (app, key)
    }

    fn request(auth: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method("POST").uri("/ingest");
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_key_resolves_project() {
        let (app, key) = app_with_key().await;
        let response = app
            .oneshot(request(Some(&format!("Bearer {}", key))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_header_is_401() {
        let (app, _) = app_with_key().await;
        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_key_is_401() {
        let (app, _) = app_with_key().await;
        let other = generate_api_key();
        let response = app
            .oneshot(request(Some(&format!("Bearer {}", other))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_key_is_401() {
        let (app, _) = app_with_key().await;
        let response = app
            .oneshot(request(Some("Bearer not-a-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
