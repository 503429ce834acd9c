//! Health check endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::data::Store;

#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<Store>,
}

pub fn routes(store: Arc<Store>) -> Router<()> {
    let state = HealthState { store };

    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct HealthQuery {
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Serialize)]
struct CheckStatus {
    status: &'static str,
}

#[derive(Serialize)]
struct Checks {
    database: CheckStatus,
}

#[derive(Serialize)]
struct SystemInfo {
    service: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    checks: Checks,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<SystemInfo>,
}

fn system_info() -> SystemInfo {
    SystemInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    }
}

/// Overall health: database probe plus optional system block
pub async fn health(
    State(state): State<HealthState>,
    Query(query): Query<HealthQuery>,
) -> impl IntoResponse {
    let database_ok = state.store.health().await.is_ok();

    let response = HealthResponse {
        status: if database_ok { "ok" } else { "degraded" },
        checks: Checks {
            database: CheckStatus {
                status: if database_ok { "ok" } else { "error" },
            },
        },
        system: query.verbose.then(system_info),
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness: the process is up; no dependency probes
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Readiness: the store answers queries
pub async fn ready(State(state): State<HealthState>) -> impl IntoResponse {
    match state.store.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "checks": { "database": { "status": "ok" } }
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "degraded",
                    "checks": { "database": { "status": "error" } }
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn app() -> Router {
        let store = Arc::new(Store::init("sqlite::memory:").await.unwrap());
        routes(store)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["checks"]["database"]["status"], "ok");
        assert!(json.get("system").is_none());
    }

    #[tokio::test]
    async fn test_health_verbose_includes_system() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/health?verbose=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["system"]["service"], "lumetrace-server");
        assert!(json["system"]["version"].is_string());
    }

    #[tokio::test]
    async fn test_live_and_ready() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["checks"]["database"]["status"], "ok");
    }
}
