//! Trace read endpoints

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::auth::AuthUser;
use crate::api::types::{ApiError, parse_time_param};
use crate::data::repositories::trace::TraceFilters;
use crate::data::types::TraceStatus;
use crate::domain::traces::{TraceDetailResponse, TraceListResponse};

use super::{DashboardState, require_project};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceListQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceDetailQuery {
    /// Expose tool-use records as synthetic child span summaries
    #[serde(default)]
    pub include_tool_spans: bool,
}

/// List a project's traces, newest first
pub async fn list_traces(
    State(state): State<DashboardState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<TraceListQuery>,
) -> Result<Json<TraceListResponse>, ApiError> {
    require_project(&state.store, &project_id, &user.email).await?;

    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(TraceStatus::parse(raw).ok_or_else(|| {
            ApiError::bad_request(
                "INVALID_STATUS",
                "status must be 'active', 'completed' or 'error'",
            )
        })?),
    };

    let filters = TraceFilters {
        session_id: query.session_id.filter(|s| !s.is_empty()),
        user_id: query.user_id.filter(|s| !s.is_empty()),
        status,
        from: parse_time_param(&query.from, "from")?,
        to: parse_time_param(&query.to, "to")?,
        limit: query.limit.unwrap_or(0),
        offset: query.offset.unwrap_or(0),
    };

    let response = state
        .traces
        .list_traces(&project_id, filters)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(response))
}

/// Full detail for one trace: span tree plus timeline context
pub async fn get_trace(
    State(state): State<DashboardState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, trace_id)): Path<(String, String)>,
    Query(query): Query<TraceDetailQuery>,
) -> Result<Json<TraceDetailResponse>, ApiError> {
    require_project(&state.store, &project_id, &user.email).await?;

    let detail = state
        .traces
        .get_trace_detail(&project_id, &trace_id, query.include_tool_spans)
        .await
        .map_err(ApiError::from_data)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(detail))
}
