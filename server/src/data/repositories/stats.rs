//! Aggregate queries for the analytics read path
//!
//! Each aggregate runs as a single SQL statement over the traces table; span
//! counts and token totals ride on the denormalized trace aggregates the
//! ingestion worker maintains.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::data::DataError;
use crate::data::types::{SessionRollup, SummaryStats, UsageBucket};

/// Inclusive time range over trace created_at (epoch millis)
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

fn push_range(query: &mut QueryBuilder<'_, Sqlite>, range: TimeRange) {
    if let Some(from) = range.from {
        query.push(" AND created_at >= ");
        query.push_bind(from);
    }
    if let Some(to) = range.to {
        query.push(" AND created_at <= ");
        query.push_bind(to);
    }
}

/// Project-level summary over a time range
pub async fn summary(
    pool: &SqlitePool,
    project_id: &str,
    range: TimeRange,
) -> Result<SummaryStats, DataError> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT COUNT(*), COALESCE(SUM(total_spans), 0), COALESCE(SUM(total_tokens), 0), \
         COALESCE(SUM(total_cost_usd), 0.0), COALESCE(AVG(total_duration_ms), 0.0), \
         COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0) \
         FROM traces WHERE project_id = ",
    );
    query.push_bind(project_id.to_string());
    push_range(&mut query, range);

    let (total_traces, total_spans, total_tokens, total_cost_usd, avg_duration_ms, error_traces): (
        i64,
        i64,
        i64,
        f64,
        f64,
        i64,
    ) = query.build_query_as().fetch_one(pool).await?;

    let error_rate = if total_traces > 0 {
        error_traces as f64 / total_traces as f64 * 100.0
    } else {
        0.0
    };

    Ok(SummaryStats {
        total_traces,
        total_spans,
        total_tokens,
        total_cost_usd,
        avg_duration_ms,
        error_rate,
    })
}

/// Daily usage buckets (UTC calendar days). Days without traffic are absent;
/// the caller zero-fills on request.
pub async fn usage_daily(
    pool: &SqlitePool,
    project_id: &str,
    range: TimeRange,
) -> Result<Vec<UsageBucket>, DataError> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT date(created_at / 1000, 'unixepoch') AS day, COUNT(*), \
         COALESCE(SUM(total_spans), 0), COALESCE(SUM(total_tokens), 0), \
         COALESCE(SUM(total_cost_usd), 0.0) \
         FROM traces WHERE project_id = ",
    );
    query.push_bind(project_id.to_string());
    push_range(&mut query, range);
    query.push(" GROUP BY day ORDER BY day ASC");

    let rows: Vec<(String, i64, i64, i64, f64)> = query.build_query_as().fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|(date, traces, spans, tokens, cost_usd)| UsageBucket {
            date,
            traces,
            spans,
            tokens,
            cost_usd,
        })
        .collect())
}

/// Session rollups grouped by non-null session id, most recent activity first
pub async fn sessions(
    pool: &SqlitePool,
    project_id: &str,
    range: TimeRange,
    limit: u32,
    offset: u32,
) -> Result<Vec<SessionRollup>, DataError> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT session_id, MAX(user_id), COUNT(*), COALESCE(SUM(total_tokens), 0), \
         COALESCE(SUM(total_cost_usd), 0.0), COALESCE(SUM(total_duration_ms), 0), \
         COALESCE(SUM(total_spans), 0), MAX(status = 'error'), MAX(status = 'active'), \
         MIN(created_at), MAX(created_at) \
         FROM traces WHERE session_id IS NOT NULL AND project_id = ",
    );
    query.push_bind(project_id.to_string());
    push_range(&mut query, range);
    query.push(" GROUP BY session_id ORDER BY MAX(created_at) DESC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    type SessionTuple = (
        String,
        Option<String>,
        i64,
        i64,
        f64,
        i64,
        i64,
        i64,
        i64,
        i64,
        i64,
    );
    let rows: Vec<SessionTuple> = query.build_query_as().fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(
            |(
                session_id,
                user_id,
                trace_count,
                total_tokens,
                total_cost_usd,
                total_duration_ms,
                total_spans,
                has_error,
                has_active,
                first_trace_at,
                last_trace_at,
            )| SessionRollup {
                session_id,
                user_id,
                trace_count,
                total_tokens,
                total_cost_usd,
                total_duration_ms,
                total_spans,
                has_error: has_error != 0,
                has_active: has_active != 0,
                first_trace_at,
                last_trace_at,
            },
        )
        .collect())
}

/// Total distinct sessions for pagination metadata
pub async fn count_sessions(
    pool: &SqlitePool,
    project_id: &str,
    range: TimeRange,
) -> Result<u64, DataError> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT COUNT(DISTINCT session_id) FROM traces \
         WHERE session_id IS NOT NULL AND project_id = ",
    );
    query.push_bind(project_id.to_string());
    push_range(&mut query, range);

    let total: (i64,) = query.build_query_as().fetch_one(pool).await?;
    Ok(total.0 as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repositories::tests::{make_trace, seed_project, setup_test_pool};
    use crate::data::repositories::trace::insert_trace;
    use crate::data::types::TraceStatus;

    // 2024-01-15 12:00:00 UTC
    const JAN_15: i64 = 1_705_320_000_000;
    const DAY_MS: i64 = 86_400_000;

    async fn seed_traces(pool: &SqlitePool) {
        seed_project(pool, "proj-1").await;
        let mut conn = pool.acquire().await.unwrap();

        let mut t1 = make_trace("proj-1", Some("s1"), JAN_15);
        t1.total_tokens = 100;
        t1.total_cost_usd = 0.01;
        t1.total_duration_ms = 500;
        t1.total_spans = 2;
        t1.status = TraceStatus::Completed;

        let mut t2 = make_trace("proj-1", Some("s1"), JAN_15 + 60_000);
        t2.total_tokens = 200;
        t2.total_cost_usd = 0.02;
        t2.total_duration_ms = 1_500;
        t2.total_spans = 1;
        t2.status = TraceStatus::Error;

        let mut t3 = make_trace("proj-1", Some("s2"), JAN_15 + DAY_MS);
        t3.total_tokens = 300;
        t3.total_cost_usd = 0.03;
        t3.total_duration_ms = 1_000;
        t3.total_spans = 3;
        t3.status = TraceStatus::Active;

        // No session id: excluded from session rollups
        let mut t4 = make_trace("proj-1", None, JAN_15 + DAY_MS);
        t4.total_tokens = 50;
        t4.total_spans = 1;
        t4.status = TraceStatus::Completed;

        for t in [&t1, &t2, &t3, &t4] {
            insert_trace(&mut conn, t).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_summary() {
        let pool = setup_test_pool().await;
        seed_traces(&pool).await;

        let stats = summary(&pool, "proj-1", TimeRange::default())
            .await
            .unwrap();
        assert_eq!(stats.total_traces, 4);
        assert_eq!(stats.total_spans, 7);
        assert_eq!(stats.total_tokens, 650);
        assert!((stats.total_cost_usd - 0.06).abs() < 1e-9);
        assert!((stats.error_rate - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_summary_empty_project() {
        let pool = setup_test_pool().await;
        seed_project(&pool, "proj-1").await;

        let stats = summary(&pool, "proj-1", TimeRange::default())
            .await
            .unwrap();
        assert_eq!(stats.total_traces, 0);
        assert_eq!(stats.error_rate, 0.0);
        assert_eq!(stats.avg_duration_ms, 0.0);
    }

    #[tokio::test]
    async fn test_summary_time_range() {
        let pool = setup_test_pool().await;
        seed_traces(&pool).await;

        let stats = summary(
            &pool,
            "proj-1",
            TimeRange {
                from: Some(JAN_15 + DAY_MS),
                to: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(stats.total_traces, 2);
        assert_eq!(stats.total_tokens, 350);
    }

    #[tokio::test]
    async fn test_usage_daily() {
        let pool = setup_test_pool().await;
        seed_traces(&pool).await;

        let buckets = usage_daily(&pool, "proj-1", TimeRange::default())
            .await
            .unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].date, "2024-01-15");
        assert_eq!(buckets[0].traces, 2);
        assert_eq!(buckets[0].tokens, 300);
        assert_eq!(buckets[1].date, "2024-01-16");
        assert_eq!(buckets[1].traces, 2);
        assert_eq!(buckets[1].tokens, 350);
    }

    #[tokio::test]
    async fn test_sessions_rollup() {
        let pool = setup_test_pool().await;
        seed_traces(&pool).await;

        let rollups = sessions(&pool, "proj-1", TimeRange::default(), 50, 0)
            .await
            .unwrap();
        assert_eq!(rollups.len(), 2);

        // s2 has the most recent activity
        assert_eq!(rollups[0].session_id, "s2");
        assert!(rollups[0].has_active);
        assert!(!rollups[0].has_error);

        let s1 = &rollups[1];
        assert_eq!(s1.session_id, "s1");
        assert_eq!(s1.trace_count, 2);
        assert_eq!(s1.total_tokens, 300);
        assert_eq!(s1.total_spans, 3);
        assert!(s1.has_error);
        assert!(!s1.has_active);
        assert_eq!(s1.first_trace_at, JAN_15);
        assert_eq!(s1.last_trace_at, JAN_15 + 60_000);

        assert_eq!(
            count_sessions(&pool, "proj-1", TimeRange::default())
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_sessions_paging() {
        let pool = setup_test_pool().await;
        seed_traces(&pool).await;

        let page = sessions(&pool, "proj-1", TimeRange::default(), 1, 1)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].session_id, "s1");
    }
}
