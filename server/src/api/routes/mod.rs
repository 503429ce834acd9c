//! API route handlers

pub mod auth;
pub mod health;
pub mod ingest;
pub mod projects;
pub mod sessions;
pub mod stats;
pub mod traces;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::api::types::ApiError;
use crate::data::Store;
use crate::data::repositories::project;
use crate::domain::analytics::AnalyticsService;
use crate::domain::traces::TraceService;

/// Shared state for the per-project dashboard read routes
#[derive(Clone)]
pub struct DashboardState {
    pub store: Arc<Store>,
    pub traces: Arc<TraceService>,
    pub analytics: Arc<AnalyticsService>,
}

/// Read routes nested under `/projects/{project_id}`
pub fn dashboard_routes(state: DashboardState) -> Router<()> {
    Router::new()
        .route("/traces", get(traces::list_traces))
        .route("/traces/{trace_id}", get(traces::get_trace))
        .route("/sessions", get(sessions::list_sessions))
        .route("/stats", get(stats::get_stats))
        .route("/usage", get(stats::get_usage))
        .with_state(state)
}

/// Resolve a project scoped to its owner; cross-tenant and missing projects
/// are both a 404
pub(crate) async fn require_project(
    store: &Store,
    project_id: &str,
    owner_email: &str,
) -> Result<(), ApiError> {
    project::get_project_for_owner(store.pool(), project_id, owner_email)
        .await
        .map_err(ApiError::from_data)?
        .ok_or(ApiError::NotFound)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::auth::jwt::create_session_token;
    use crate::api::auth::{AuthState, require_auth};
    use crate::data::repositories::span::insert_span;
    use crate::data::repositories::tests::{make_span, make_trace};
    use crate::data::repositories::trace::insert_trace;
    use crate::data::repositories::user::create_user;
    use crate::data::types::TraceRow;

    const JWT_SECRET: &[u8] = b"test-jwt-secret-32-bytes-long!!!";

    /// Two tenants, one project each; project A holds one trace of two spans
    async fn setup() -> (Router, Arc<Store>, String) {
        let store = Arc::new(Store::init("sqlite::memory:").await.unwrap());
        for (email, project_id) in [("a@example.com", "proj-a"), ("b@example.com", "proj-b")] {
            create_user(store.pool(), email, "x", None).await.unwrap();
            project::create_project(store.pool(), "P", email, &format!("h-{}", project_id), "le_x")
                .await
                .unwrap();
            // Repoint id for a predictable path
            sqlx::query("UPDATE projects SET id = ? WHERE owner_email = ?")
                .bind(project_id)
                .bind(email)
                .execute(store.pool())
                .await
                .unwrap();
        }

        let trace: TraceRow = {
            let mut t = make_trace("proj-a", Some("s1"), 1_000);
            t.total_spans = 2;
            t.total_tokens = 30;
            t
        };
        let mut conn = store.pool().acquire().await.unwrap();
        insert_trace(&mut conn, &trace).await.unwrap();
        let root = make_span(&trace.id, 1_000);
        let mut child = make_span(&trace.id, 1_200);
        child.parent_span_id = Some(root.id.clone());
        insert_span(&mut conn, &root).await.unwrap();
        insert_span(&mut conn, &child).await.unwrap();
        drop(conn);

        let router = dashboard_routes(DashboardState {
            store: store.clone(),
            traces: Arc::new(TraceService::new(store.clone())),
            analytics: Arc::new(AnalyticsService::new(store.clone())),
        })
        .layer(axum::middleware::from_fn_with_state(
            AuthState {
                store: store.clone(),
                jwt_secret: JWT_SECRET.to_vec(),
            },
            require_auth,
        ));

        // The dashboard router nests under /projects/{project_id} in the real
        // server; tests mount it the same way
        let router = Router::new().nest("/projects/{project_id}", router);

        (router, store, trace.id)
    }

    fn get(uri: &str, email: &str) -> Request<Body> {
        let token = create_session_token(JWT_SECRET, email, email, 24).unwrap();
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_trace_detail_with_tree() {
        let (app, _store, trace_id) = setup().await;

        let response = app
            .oneshot(get(
                &format!("/projects/proj-a/traces/{}", trace_id),
                "a@example.com",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["id"], trace_id);
        assert_eq!(json["spanTree"].as_array().unwrap().len(), 1);
        assert_eq!(json["spanTree"][0]["children"].as_array().unwrap().len(), 1);
        assert_eq!(json["spanTree"][0]["depth"], 0);
        assert!(json["timeline"]["totalDurationMs"].is_number());

        // Node timeline bounds hold
        let root = &json["spanTree"][0];
        let start = root["timelineStart"].as_f64().unwrap();
        let width = root["timelineWidth"].as_f64().unwrap();
        assert!(start + width <= 1.0 + 1e-9);
    }

    #[tokio::test]
    async fn test_cross_tenant_trace_is_404() {
        let (app, _store, trace_id) = setup().await;

        // Tenant B probes tenant A's project path with the correct trace id
        let response = app
            .clone()
            .oneshot(get(
                &format!("/projects/proj-a/traces/{}", trace_id),
                "b@example.com",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Same through their own project path
        let response = app
            .oneshot(get(
                &format!("/projects/proj-b/traces/{}", trace_id),
                "b@example.com",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_traces_and_sessions() {
        let (app, _store, trace_id) = setup().await;

        let json = body_json(
            app.clone()
                .oneshot(get("/projects/proj-a/traces", "a@example.com"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["data"][0]["id"], trace_id);
        assert_eq!(json["limit"], 50);

        let json = body_json(
            app.oneshot(get("/projects/proj-a/sessions", "a@example.com"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["data"][0]["sessionId"], "s1");
        assert_eq!(json["data"][0]["traceCount"], 1);
    }

    #[tokio::test]
    async fn test_stats_and_usage() {
        let (app, _store, _trace_id) = setup().await;

        let json = body_json(
            app.clone()
                .oneshot(get("/projects/proj-a/stats", "a@example.com"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["totalTraces"], 1);
        assert_eq!(json["totalSpans"], 2);
        assert_eq!(json["totalTokens"], 30);

        let json = body_json(
            app.oneshot(get("/projects/proj-a/usage", "a@example.com"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["traces"], 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_dashboard_is_401() {
        let (app, _store, _trace_id) = setup().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/projects/proj-a/traces")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
