//! Trace read side: span processing, tree assembly, timeline context

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::core::constants::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::data::repositories::{span as span_repo, trace as trace_repo};
use crate::data::store::with_read_timeout;
use crate::data::types::{SpanRow, SpanStatus, SpanType, ToolUse, TraceRow, TraceStatus};
use crate::data::{DataError, Store};
use crate::domain::parser::SubType;
use crate::utils::time::now_millis;

// ============================================================================
// VIEWS
// ============================================================================

/// API-facing span shape (camelCase), classified on read
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    #[serde(rename = "type")]
    pub span_type: SpanType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub status: SpanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub started_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_write_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_token_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_uses: Vec<ToolUse>,
    pub sub_type: SubType,
}

/// One node of the assembled span tree
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanNode {
    #[serde(flatten)]
    pub span: SpanView,
    pub depth: u32,
    /// Fraction of the trace timeline where this span starts, in [0, 1]
    pub timeline_start: f64,
    /// Fraction of the trace timeline this span covers, in [0, 1]
    pub timeline_width: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SpanNode>,
}

/// Timeline context for the whole trace
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineContext {
    pub min_time: i64,
    pub max_time: i64,
    pub total_duration_ms: i64,
}

/// API-facing trace shape (camelCase)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceView {
    pub id: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub status: TraceStatus,
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub total_duration_ms: i64,
    pub total_spans: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<TraceRow> for TraceView {
    fn from(t: TraceRow) -> Self {
        Self {
            id: t.id,
            project_id: t.project_id,
            session_id: t.session_id,
            user_id: t.user_id,
            status: t.status,
            total_tokens: t.total_tokens,
            total_cost_usd: t.total_cost_usd,
            total_duration_ms: t.total_duration_ms,
            total_spans: t.total_spans,
            metadata: t.metadata,
            tags: t.tags,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Full trace detail: trace fields plus tree and timeline
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceDetailResponse {
    #[serde(flatten)]
    pub trace: TraceView,
    pub span_tree: Vec<SpanNode>,
    pub timeline: TimelineContext,
}

/// Paged trace listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceListResponse {
    pub data: Vec<TraceView>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct TraceService {
    store: Arc<Store>,
}

impl TraceService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Assemble the full detail for one trace. `Ok(None)` covers both absent
    /// and cross-tenant traces.
    pub async fn get_trace_detail(
        &self,
        project_id: &str,
        trace_id: &str,
        include_tool_spans: bool,
    ) -> Result<Option<TraceDetailResponse>, DataError> {
        let pool = self.store.pool();

        let Some(trace) =
            with_read_timeout(trace_repo::get_trace(pool, project_id, trace_id)).await?
        else {
            return Ok(None);
        };

        let spans = with_read_timeout(span_repo::list_spans_for_trace(pool, trace_id)).await?;
        let (span_tree, timeline) = assemble_tree(spans, include_tool_spans, now_millis());

        Ok(Some(TraceDetailResponse {
            trace: trace.into(),
            span_tree,
            timeline,
        }))
    }

    /// List traces with filters; limit defaults to 50 and caps at 200.
    pub async fn list_traces(
        &self,
        project_id: &str,
        mut filters: trace_repo::TraceFilters,
    ) -> Result<TraceListResponse, DataError> {
        if filters.limit == 0 {
            filters.limit = DEFAULT_LIST_LIMIT;
        }
        filters.limit = filters.limit.min(MAX_LIST_LIMIT);

        let (traces, total) =
            with_read_timeout(trace_repo::list_traces(self.store.pool(), project_id, &filters))
                .await?;

        Ok(TraceListResponse {
            data: traces.into_iter().map(TraceView::from).collect(),
            total,
            limit: filters.limit,
            offset: filters.offset,
        })
    }
}

// ============================================================================
// PROCESSING
// ============================================================================

/// Classify a stored span for the API: planning iff tool uses are attached
pub fn process_span(row: SpanRow) -> SpanView {
    let sub_type = if row.tool_uses.is_empty() {
        SubType::Response
    } else {
        SubType::Planning
    };

    SpanView {
        id: row.id,
        parent_span_id: row.parent_span_id,
        span_type: row.span_type,
        name: row.name,
        input: row.input,
        output: row.output,
        input_tokens: row.input_tokens,
        output_tokens: row.output_tokens,
        cost_usd: row.cost_usd,
        duration_ms: row.duration_ms,
        status: row.status,
        error_message: row.error_message,
        model: row.model,
        provider: row.provider,
        metadata: row.metadata,
        started_at: row.started_at,
        ended_at: row.ended_at,
        stop_reason: row.stop_reason,
        cache_read_tokens: row.cache_read_tokens,
        cache_write_tokens: row.cache_write_tokens,
        reasoning_tokens: row.reasoning_tokens,
        first_token_ms: row.first_token_ms,
        thinking: row.thinking,
        tool_uses: row.tool_uses,
        sub_type,
    }
}

/// Build the span tree plus timeline context.
///
/// Roots are spans without a parent, in start order (input order breaks
/// ties); children attach under their parent the same way. A span whose
/// parent id resolves to nothing is kept as a root rather than dropped.
pub fn assemble_tree(
    spans: Vec<SpanRow>,
    include_tool_spans: bool,
    now: i64,
) -> (Vec<SpanNode>, TimelineContext) {
    let views: Vec<SpanView> = spans.into_iter().map(process_span).collect();

    let (min_time, max_time) = if views.is_empty() {
        (0, 0)
    } else {
        let min = views.iter().map(|s| s.started_at).min().unwrap_or(0);
        let max = views
            .iter()
            .map(|s| s.ended_at.unwrap_or(now))
            .max()
            .unwrap_or(0);
        (min, max.max(min))
    };
    let timeline = TimelineContext {
        min_time,
        max_time,
        total_duration_ms: max_time - min_time,
    };

    let known_ids: HashSet<String> = views.iter().map(|s| s.id.clone()).collect();
    let (roots, children): (Vec<SpanView>, Vec<SpanView>) = views.into_iter().partition(|s| {
        s.parent_span_id
            .as_ref()
            .map(|p| !known_ids.contains(p))
            .unwrap_or(true)
    });

    let mut nodes: Vec<SpanNode> = roots
        .into_iter()
        .map(|view| build_node(view, &children, 0, &timeline, now, include_tool_spans))
        .collect();
    nodes.sort_by_key(|n| n.span.started_at);

    (nodes, timeline)
}

fn build_node(
    view: SpanView,
    all_children: &[SpanView],
    depth: u32,
    timeline: &TimelineContext,
    now: i64,
    include_tool_spans: bool,
) -> SpanNode {
    let mut children: Vec<SpanNode> = all_children
        .iter()
        .filter(|c| c.parent_span_id.as_deref() == Some(view.id.as_str()))
        .cloned()
        .map(|c| build_node(c, all_children, depth + 1, timeline, now, include_tool_spans))
        .collect();
    children.sort_by_key(|n| n.span.started_at);

    let (timeline_start, timeline_width) = timeline_slot(&view, timeline, now);

    if include_tool_spans {
        let synthetic = synthetic_tool_children(&view, depth + 1, timeline_start, timeline_width);
        children.extend(synthetic);
    }

    SpanNode {
        span: view,
        depth,
        timeline_start,
        timeline_width,
        children,
    }
}

/// Position a span on the normalized [0, 1] timeline
fn timeline_slot(view: &SpanView, timeline: &TimelineContext, now: i64) -> (f64, f64) {
    if timeline.total_duration_ms == 0 {
        return (0.0, 1.0);
    }

    let total = timeline.total_duration_ms as f64;
    let start = (view.started_at - timeline.min_time) as f64 / total;
    let end = view.ended_at.unwrap_or(now).max(view.started_at);
    let width = (end - view.started_at) as f64 / total;

    (start.clamp(0.0, 1.0), width.clamp(0.0, 1.0))
}

/// Tool-use records exposed as child span summaries, at the caller's option
fn synthetic_tool_children(
    view: &SpanView,
    depth: u32,
    timeline_start: f64,
    timeline_width: f64,
) -> Vec<SpanNode> {
    view.tool_uses
        .iter()
        .map(|tool| SpanNode {
            span: SpanView {
                id: format!("{}:{}", view.id, tool.id),
                parent_span_id: Some(view.id.clone()),
                span_type: SpanType::Tool,
                name: tool.name.clone(),
                input: Some(tool.input.clone()),
                output: tool.output.clone(),
                input_tokens: 0,
                output_tokens: 0,
                cost_usd: 0.0,
                duration_ms: tool.duration_ms.unwrap_or(0),
                status: SpanStatus::parse(&tool.status).unwrap_or(SpanStatus::Pending),
                error_message: None,
                model: None,
                provider: None,
                metadata: Some(serde_json::json!({"synthetic": true})),
                started_at: view.started_at,
                ended_at: view.ended_at,
                stop_reason: None,
                cache_read_tokens: None,
                cache_write_tokens: None,
                reasoning_tokens: None,
                first_token_ms: None,
                thinking: None,
                tool_uses: Vec::new(),
                sub_type: SubType::Response,
            },
            depth,
            timeline_start,
            timeline_width,
            children: Vec::new(),
        })
        .collect()
}
