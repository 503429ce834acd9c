//! Bulk event intake endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Json, Router};

use crate::api::auth::IngestProject;
use crate::api::types::ApiError;
use crate::core::constants::MAX_EVENTS_PER_REQUEST;
use crate::domain::ingest::{IngestRequest, IngestResponse, IngestionService};

#[derive(Clone)]
pub struct IngestApiState {
    pub ingestion: Arc<IngestionService>,
}

pub fn routes(ingestion: Arc<IngestionService>) -> Router<()> {
    let state = IngestApiState { ingestion };

    Router::new().route("/", post(ingest)).with_state(state)
}

/// Accept 1..100 events. Fully-accepted batches answer 200; any per-event
/// rejection (validation or queue overflow) turns the response into a 207
/// with the per-index error list.
pub async fn ingest(
    State(state): State<IngestApiState>,
    Extension(project): Extension<IngestProject>,
    Json(body): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    if body.events.is_empty() {
        return Err(ApiError::bad_request(
            "NO_EVENTS",
            "Request must contain at least one event",
        ));
    }
    if body.events.len() > MAX_EVENTS_PER_REQUEST {
        return Err(ApiError::bad_request(
            "TOO_MANY_EVENTS",
            format!(
                "Request may contain at most {} events",
                MAX_EVENTS_PER_REQUEST
            ),
        ));
    }

    let response = state.ingestion.ingest(&project.project_id, body).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok((status, Json(response)))
}
