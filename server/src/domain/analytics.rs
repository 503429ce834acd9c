//! Analytics read side: summaries, usage time-series, session rollups

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::constants::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::data::repositories::stats;
use crate::data::store::with_read_timeout;
use crate::data::types::{SessionRollup, SummaryStats, UsageBucket};
use crate::data::{DataError, Store};
use crate::utils::time::millis_to_datetime;

pub use crate::data::repositories::stats::TimeRange;

/// Paged session listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub data: Vec<SessionRollup>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

pub struct AnalyticsService {
    store: Arc<Store>,
}

impl AnalyticsService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Project summary over a time range
    pub async fn summary(
        &self,
        project_id: &str,
        range: TimeRange,
    ) -> Result<SummaryStats, DataError> {
        with_read_timeout(stats::summary(self.store.pool(), project_id, range)).await
    }

    /// Daily usage buckets. Empty days are omitted unless `zero_fill` is set,
    /// in which case gaps between the range bounds (or the observed first and
    /// last active days) are filled with zero buckets.
    pub async fn usage(
        &self,
        project_id: &str,
        range: TimeRange,
        zero_fill: bool,
    ) -> Result<Vec<UsageBucket>, DataError> {
        let buckets =
            with_read_timeout(stats::usage_daily(self.store.pool(), project_id, range)).await?;

        if zero_fill {
            Ok(zero_fill_days(buckets, range))
        } else {
            Ok(buckets)
        }
    }

    /// Session rollups, most recent activity first
    pub async fn sessions(
        &self,
        project_id: &str,
        range: TimeRange,
        limit: u32,
        offset: u32,
    ) -> Result<SessionListResponse, DataError> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit }.min(MAX_LIST_LIMIT);

        let pool = self.store.pool();
        let data =
            with_read_timeout(stats::sessions(pool, project_id, range, limit, offset)).await?;
        let total = with_read_timeout(stats::count_sessions(pool, project_id, range)).await?;

        Ok(SessionListResponse {
            data,
            total,
            limit,
            offset,
        })
    }
}

/// Insert zero buckets for days without traffic
fn zero_fill_days(buckets: Vec<UsageBucket>, range: TimeRange) -> Vec<UsageBucket> {
    let start = range
        .from
        .map(|ms| millis_to_datetime(ms).date_naive())
        .or_else(|| parse_bucket_date(buckets.first()));
    let end = range
        .to
        .map(|ms| millis_to_datetime(ms).date_naive())
        .or_else(|| parse_bucket_date(buckets.last()));

    let (Some(start), Some(end)) = (start, end) else {
        return buckets;
    };
    if start > end {
        return buckets;
    }

    let mut by_date: std::collections::BTreeMap<String, UsageBucket> = buckets
        .into_iter()
        .map(|b| (b.date.clone(), b))
        .collect();

    let mut filled = Vec::new();
    let mut day = start;
    while day <= end {
        let key = day.format("%Y-%m-%d").to_string();
        filled.push(by_date.remove(&key).unwrap_or(UsageBucket {
            date: key,
            traces: 0,
            spans: 0,
            tokens: 0,
            cost_usd: 0.0,
        }));
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
        if filled.len() > 10_000 {
            // Runaway ranges are truncated rather than ballooning the response
            break;
        }
    }

    filled
}

fn parse_bucket_date(bucket: Option<&UsageBucket>) -> Option<NaiveDate> {
    bucket.and_then(|b| NaiveDate::parse_from_str(&b.date, "%Y-%m-%d").ok())
}
