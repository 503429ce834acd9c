//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::auth::{ApiKeyAuthState, AuthState, require_api_key, require_auth};
use super::middleware;
use super::rate_limit::{RateLimitState, RateLimiter, rate_limit_middleware};
use super::routes::{self, DashboardState, auth, health, ingest, projects};
use crate::core::CoreApp;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown; returns CoreApp so the caller can finish the
    /// graceful teardown
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let auth_state = AuthState {
            store: app.store.clone(),
            jwt_secret: app.config.auth.jwt_secret.clone(),
        };

        // Auth routes carry per-IP rate limiting for brute-force protection
        let auth_routes = auth::routes(
            app.store.clone(),
            app.config.auth.jwt_secret.clone(),
            app.config.auth.token_expiration_hours,
        )
        .layer(axum::middleware::from_fn_with_state(
            RateLimitState {
                limiter: Arc::new(RateLimiter::new(app.config.auth.rate_limit_auth_rpm)),
            },
            rate_limit_middleware,
        ));

        // Ingest authenticates by project API key
        let ingest_routes = ingest::routes(app.ingestion.clone()).layer(
            axum::middleware::from_fn_with_state(
                ApiKeyAuthState {
                    store: app.store.clone(),
                    api_key_secret: app.config.auth.api_key_secret.clone(),
                },
                require_api_key,
            ),
        );

        // Dashboard routes require a JWT session
        let projects_routes =
            projects::routes(app.store.clone(), app.config.auth.api_key_secret.clone()).layer(
                axum::middleware::from_fn_with_state(auth_state.clone(), require_auth),
            );

        let dashboard_routes = routes::dashboard_routes(DashboardState {
            store: app.store.clone(),
            traces: app.traces.clone(),
            analytics: app.analytics.clone(),
        })
        .layer(axum::middleware::from_fn_with_state(auth_state, require_auth));

        let router = Router::new()
            .merge(health::routes(app.store.clone()))
            .nest("/api/v1/auth", auth_routes)
            .nest("/api/v1/ingest", ingest_routes)
            .nest("/api/v1/projects", projects_routes)
            .nest("/api/v1/dashboard/projects/{project_id}", dashboard_routes)
            .fallback(middleware::handle_404)
            .layer(axum::middleware::from_fn(middleware::security_headers))
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
            .layer(middleware::cors(app.config.server.frontend_url.as_deref()))
            .layer(DefaultBodyLimit::max(app.config.server.max_body_bytes));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
