//! Session rollup endpoint

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::auth::AuthUser;
use crate::api::types::{ApiError, parse_time_param};
use crate::domain::analytics::{SessionListResponse, TimeRange};

use super::{DashboardState, require_project};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// List session rollups, most recent activity first
pub async fn list_sessions(
    State(state): State<DashboardState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<SessionListResponse>, ApiError> {
    require_project(&state.store, &project_id, &user.email).await?;

    let range = TimeRange {
        from: parse_time_param(&query.from, "from")?,
        to: parse_time_param(&query.to, "to")?,
    };

    let response = state
        .analytics
        .sessions(
            &project_id,
            range,
            query.limit.unwrap_or(0),
            query.offset.unwrap_or(0),
        )
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(response))
}
