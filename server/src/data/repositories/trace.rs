//! Trace repository
//!
//! Write-side functions take a `SqliteConnection` so the ingestion worker can
//! run the trace upsert, span insert, and aggregate update inside one
//! transaction. Read-side functions take the pool.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::data::DataError;
use crate::data::types::{
    TraceRow, TraceStatus, column_to_json, column_to_tags, json_to_column, tags_to_column,
};

type TraceTuple = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    i64,
    f64,
    i64,
    i64,
    Option<String>,
    Option<String>,
    i64,
    i64,
);

const TRACE_COLUMNS: &str = "id, project_id, session_id, user_id, status, total_tokens, \
     total_cost_usd, total_duration_ms, total_spans, metadata, tags, created_at, updated_at";

fn from_tuple(t: TraceTuple) -> TraceRow {
    let (
        id,
        project_id,
        session_id,
        user_id,
        status,
        total_tokens,
        total_cost_usd,
        total_duration_ms,
        total_spans,
        metadata,
        tags,
        created_at,
        updated_at,
    ) = t;
    TraceRow {
        id,
        project_id,
        session_id,
        user_id,
        status: TraceStatus::parse(&status).unwrap_or(TraceStatus::Active),
        total_tokens,
        total_cost_usd,
        total_duration_ms,
        total_spans,
        metadata: column_to_json(metadata),
        tags: column_to_tags(tags),
        created_at,
        updated_at,
    }
}

/// Filters for trace listing
#[derive(Debug, Clone, Default)]
pub struct TraceFilters {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<TraceStatus>,
    /// Inclusive lower bound on created_at (epoch millis)
    pub from: Option<i64>,
    /// Inclusive upper bound on created_at (epoch millis)
    pub to: Option<i64>,
    pub limit: u32,
    pub offset: u32,
}

/// Insert a new trace row (ingestion transaction)
pub async fn insert_trace(conn: &mut SqliteConnection, trace: &TraceRow) -> Result<(), DataError> {
    sqlx::query(
        "INSERT INTO traces (id, project_id, session_id, user_id, status, total_tokens, \
         total_cost_usd, total_duration_ms, total_spans, metadata, tags, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&trace.id)
    .bind(&trace.project_id)
    .bind(&trace.session_id)
    .bind(&trace.user_id)
    .bind(trace.status.as_str())
    .bind(trace.total_tokens)
    .bind(trace.total_cost_usd)
    .bind(trace.total_duration_ms)
    .bind(trace.total_spans)
    .bind(json_to_column(&trace.metadata))
    .bind(tags_to_column(&trace.tags))
    .bind(trace.created_at)
    .bind(trace.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Find the trace holding a session's spans (ingestion transaction).
///
/// The session window is unbounded: any trace sharing the session id is the
/// grouping target, regardless of its status. Oldest wins so concurrent
/// creators converge on one trace.
pub async fn find_trace_for_session(
    conn: &mut SqliteConnection,
    project_id: &str,
    session_id: &str,
) -> Result<Option<TraceRow>, DataError> {
    let row = sqlx::query_as::<_, TraceTuple>(&format!(
        "SELECT {TRACE_COLUMNS} FROM traces WHERE project_id = ? AND session_id = ? \
         ORDER BY created_at ASC LIMIT 1"
    ))
    .bind(project_id)
    .bind(session_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(from_tuple))
}

/// Overwrite a trace's aggregate totals and status (ingestion transaction)
#[allow(clippy::too_many_arguments)]
pub async fn update_trace_aggregates(
    conn: &mut SqliteConnection,
    trace_id: &str,
    total_tokens: i64,
    total_cost_usd: f64,
    total_duration_ms: i64,
    total_spans: i64,
    status: TraceStatus,
    updated_at: i64,
) -> Result<(), DataError> {
    sqlx::query(
        "UPDATE traces SET total_tokens = ?, total_cost_usd = ?, total_duration_ms = ?, \
         total_spans = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(total_tokens)
    .bind(total_cost_usd)
    .bind(total_duration_ms)
    .bind(total_spans)
    .bind(status.as_str())
    .bind(updated_at)
    .bind(trace_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Get a trace scoped to a project.
/// A trace belonging to another project is indistinguishable from a missing
/// one, which is what the 404-on-cross-tenant contract needs.
pub async fn get_trace(
    pool: &SqlitePool,
    project_id: &str,
    trace_id: &str,
) -> Result<Option<TraceRow>, DataError> {
    let row = sqlx::query_as::<_, TraceTuple>(&format!(
        "SELECT {TRACE_COLUMNS} FROM traces WHERE id = ? AND project_id = ?"
    ))
    .bind(trace_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(from_tuple))
}

/// List traces for a project with filters, newest first
pub async fn list_traces(
    pool: &SqlitePool,
    project_id: &str,
    filters: &TraceFilters,
) -> Result<(Vec<TraceRow>, u64), DataError> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {TRACE_COLUMNS} FROM traces"));
    push_filters(&mut query, project_id, filters);
    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(filters.limit);
    query.push(" OFFSET ");
    query.push_bind(filters.offset);

    let rows: Vec<TraceTuple> = query.build_query_as().fetch_all(pool).await?;

    let mut count_query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM traces");
    push_filters(&mut count_query, project_id, filters);
    let total: (i64,) = count_query.build_query_as().fetch_one(pool).await?;

    Ok((rows.into_iter().map(from_tuple).collect(), total.0 as u64))
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, project_id: &str, filters: &TraceFilters) {
    query.push(" WHERE project_id = ");
    query.push_bind(project_id.to_string());

    if let Some(session_id) = &filters.session_id {
        query.push(" AND session_id = ");
        query.push_bind(session_id.clone());
    }
    if let Some(user_id) = &filters.user_id {
        query.push(" AND user_id = ");
        query.push_bind(user_id.clone());
    }
    if let Some(status) = filters.status {
        query.push(" AND status = ");
        query.push_bind(status.as_str());
    }
    if let Some(from) = filters.from {
        query.push(" AND created_at >= ");
        query.push_bind(from);
    }
    if let Some(to) = filters.to {
        query.push(" AND created_at <= ");
        query.push_bind(to);
    }
}
