//! Summary and usage time-series endpoints

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::auth::AuthUser;
use crate::api::types::{ApiError, parse_time_param};
use crate::data::types::{SummaryStats, UsageBucket};
use crate::domain::analytics::TimeRange;

use super::{DashboardState, require_project};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// Bucket granularity; only daily buckets are served
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub zero_fill: bool,
}

/// Project summary over a time range
pub async fn get_stats(
    State(state): State<DashboardState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<SummaryStats>, ApiError> {
    require_project(&state.store, &project_id, &user.email).await?;

    let range = TimeRange {
        from: parse_time_param(&query.from, "from")?,
        to: parse_time_param(&query.to, "to")?,
    };

    let stats = state
        .analytics
        .summary(&project_id, range)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(stats))
}

/// Daily usage buckets
pub async fn get_usage(
    State(state): State<DashboardState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<Vec<UsageBucket>>, ApiError> {
    require_project(&state.store, &project_id, &user.email).await?;

    if let Some(bucket) = query.bucket.as_deref()
        && !bucket.is_empty()
        && bucket != "day"
    {
        return Err(ApiError::bad_request(
            "INVALID_BUCKET",
            "bucket must be 'day'",
        ));
    }

    let range = TimeRange {
        from: parse_time_param(&query.from, "from")?,
        to: parse_time_param(&query.to, "to")?,
    };

    let buckets = state
        .analytics
        .usage(&project_id, range, query.zero_fill)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(buckets))
}
