//! Span repository

use sqlx::{SqliteConnection, SqlitePool};

use crate::data::DataError;
use crate::data::types::{
    SpanRow, SpanStatus, SpanType, column_to_json, column_to_tool_uses, json_to_column,
    tool_uses_to_column,
};

/// Raw span record matching the column layout (too wide for a tuple)
#[derive(sqlx::FromRow)]
struct SpanRecord {
    id: String,
    trace_id: String,
    parent_span_id: Option<String>,
    #[sqlx(rename = "type")]
    span_type: String,
    name: String,
    input: Option<String>,
    output: Option<String>,
    input_tokens: i64,
    output_tokens: i64,
    cost_usd: f64,
    duration_ms: i64,
    status: String,
    error_message: Option<String>,
    model: Option<String>,
    provider: Option<String>,
    metadata: Option<String>,
    started_at: i64,
    ended_at: Option<i64>,
    stop_reason: Option<String>,
    cache_read_tokens: Option<i64>,
    cache_write_tokens: Option<i64>,
    reasoning_tokens: Option<i64>,
    first_token_ms: Option<i64>,
    thinking: Option<String>,
    tool_uses: Option<String>,
}

impl From<SpanRecord> for SpanRow {
    fn from(r: SpanRecord) -> Self {
        SpanRow {
            id: r.id,
            trace_id: r.trace_id,
            parent_span_id: r.parent_span_id,
            span_type: SpanType::parse(&r.span_type).unwrap_or(SpanType::Custom),
            name: r.name,
            input: column_to_json(r.input),
            output: column_to_json(r.output),
            input_tokens: r.input_tokens,
            output_tokens: r.output_tokens,
            cost_usd: r.cost_usd,
            duration_ms: r.duration_ms,
            status: SpanStatus::parse(&r.status).unwrap_or(SpanStatus::Pending),
            error_message: r.error_message,
            model: r.model,
            provider: r.provider,
            metadata: column_to_json(r.metadata),
            started_at: r.started_at,
            ended_at: r.ended_at,
            stop_reason: r.stop_reason,
            cache_read_tokens: r.cache_read_tokens,
            cache_write_tokens: r.cache_write_tokens,
            reasoning_tokens: r.reasoning_tokens,
            first_token_ms: r.first_token_ms,
            thinking: r.thinking,
            tool_uses: column_to_tool_uses(r.tool_uses),
        }
    }
}

/// Insert a span row (ingestion transaction)
pub async fn insert_span(conn: &mut SqliteConnection, span: &SpanRow) -> Result<(), DataError> {
    sqlx::query(
        "INSERT INTO spans (id, trace_id, parent_span_id, type, name, input, output, \
         input_tokens, output_tokens, cost_usd, duration_ms, status, error_message, model, \
         provider, metadata, started_at, ended_at, stop_reason, cache_read_tokens, \
         cache_write_tokens, reasoning_tokens, first_token_ms, thinking, tool_uses) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&span.id)
    .bind(&span.trace_id)
    .bind(&span.parent_span_id)
    .bind(span.span_type.as_str())
    .bind(&span.name)
    .bind(json_to_column(&span.input))
    .bind(json_to_column(&span.output))
    .bind(span.input_tokens)
    .bind(span.output_tokens)
    .bind(span.cost_usd)
    .bind(span.duration_ms)
    .bind(span.status.as_str())
    .bind(&span.error_message)
    .bind(&span.model)
    .bind(&span.provider)
    .bind(json_to_column(&span.metadata))
    .bind(span.started_at)
    .bind(span.ended_at)
    .bind(&span.stop_reason)
    .bind(span.cache_read_tokens)
    .bind(span.cache_write_tokens)
    .bind(span.reasoning_tokens)
    .bind(span.first_token_ms)
    .bind(&span.thinking)
    .bind(tool_uses_to_column(&span.tool_uses))
    .execute(conn)
    .await?;

    Ok(())
}

/// List a trace's spans ordered by start time, ties broken by insertion order
pub async fn list_spans_for_trace(
    pool: &SqlitePool,
    trace_id: &str,
) -> Result<Vec<SpanRow>, DataError> {
    let records = sqlx::query_as::<_, SpanRecord>(
        "SELECT * FROM spans WHERE trace_id = ? ORDER BY started_at ASC, rowid ASC",
    )
    .bind(trace_id)
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(SpanRow::from).collect())
}

/// Count spans still pending inside a trace (ingestion transaction)
pub async fn count_pending_spans(
    conn: &mut SqliteConnection,
    trace_id: &str,
) -> Result<i64, DataError> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM spans WHERE trace_id = ? AND status = 'pending'")
            .bind(trace_id)
            .fetch_one(conn)
            .await?;

    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repositories::tests::{
        make_span, make_trace, seed_project, setup_test_pool,
    };
    use crate::data::repositories::trace::insert_trace;
    use crate::data::types::ToolUse;

    #[tokio::test]
    async fn test_insert_and_list_spans() {
        let pool = setup_test_pool().await;
        seed_project(&pool, "proj-1").await;
        let trace = make_trace("proj-1", None, 1_000);

        let mut conn = pool.acquire().await.unwrap();
        insert_trace(&mut conn, &trace).await.unwrap();

        let mut span = make_span(&trace.id, 1_000);
        span.stop_reason = Some("end_turn".into());
        span.thinking = Some("considering options".into());
        span.tool_uses = vec![ToolUse {
            id: "t1".into(),
            name: "lookup".into(),
            input: serde_json::json!({"key": "value"}),
            output: None,
            status: "pending".into(),
            duration_ms: None,
        }];
        insert_span(&mut conn, &span).await.unwrap();
        drop(conn);

        let spans = list_spans_for_trace(&pool, &trace.id).await.unwrap();
        assert_eq!(spans.len(), 1);
        let fetched = &spans[0];
        assert_eq!(fetched.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(fetched.thinking.as_deref(), Some("considering options"));
        assert_eq!(fetched.tool_uses.len(), 1);
        assert_eq!(fetched.tool_uses[0].name, "lookup");
    }

    #[tokio::test]
    async fn test_list_spans_ordering() {
        let pool = setup_test_pool().await;
        seed_project(&pool, "proj-1").await;
        let trace = make_trace("proj-1", None, 1_000);

        let mut conn = pool.acquire().await.unwrap();
        insert_trace(&mut conn, &trace).await.unwrap();

        let late = make_span(&trace.id, 3_000);
        let early = make_span(&trace.id, 1_000);
        let tied = make_span(&trace.id, 1_000);
        insert_span(&mut conn, &late).await.unwrap();
        insert_span(&mut conn, &early).await.unwrap();
        insert_span(&mut conn, &tied).await.unwrap();
        drop(conn);

        let spans = list_spans_for_trace(&pool, &trace.id).await.unwrap();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].id, early.id);
        // Insertion order breaks the started_at tie
        assert_eq!(spans[1].id, tied.id);
        assert_eq!(spans[2].id, late.id);
    }

    #[tokio::test]
    async fn test_count_pending_spans() {
        let pool = setup_test_pool().await;
        seed_project(&pool, "proj-1").await;
        let trace = make_trace("proj-1", None, 1_000);

        let mut conn = pool.acquire().await.unwrap();
        insert_trace(&mut conn, &trace).await.unwrap();

        let mut pending = make_span(&trace.id, 1_000);
        pending.status = SpanStatus::Pending;
        let done = make_span(&trace.id, 1_000);
        insert_span(&mut conn, &pending).await.unwrap();
        insert_span(&mut conn, &done).await.unwrap();

        assert_eq!(count_pending_spans(&mut conn, &trace.id).await.unwrap(), 1);
    }
}
