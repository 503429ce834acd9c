//! Row types and shared enums for the store

use serde::{Deserialize, Serialize};

// ============================================================================
// ENUMS
// ============================================================================

/// Trace lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Active,
    Completed,
    Error,
}

impl TraceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Span terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Pending,
    Success,
    Error,
}

impl SpanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Observable operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanType {
    Llm,
    Agent,
    Tool,
    Retrieval,
    Embedding,
    Guardrail,
    Rerank,
    Custom,
}

impl SpanType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Agent => "agent",
            Self::Tool => "tool",
            Self::Retrieval => "retrieval",
            Self::Embedding => "embedding",
            Self::Guardrail => "guardrail",
            Self::Rerank => "rerank",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "llm" => Some(Self::Llm),
            "agent" => Some(Self::Agent),
            "tool" => Some(Self::Tool),
            "retrieval" => Some(Self::Retrieval),
            "embedding" => Some(Self::Embedding),
            "guardrail" => Some(Self::Guardrail),
            "rerank" => Some(Self::Rerank),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

// ============================================================================
// ROW TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub owner_email: String,
    pub api_key_hash: String,
    pub api_key_prefix: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct TraceRow {
    pub id: String,
    pub project_id: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub status: TraceStatus,
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub total_duration_ms: i64,
    pub total_spans: i64,
    pub metadata: Option<serde_json::Value>,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Structured function-call record extracted from a provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SpanRow {
    pub id: String,
    pub trace_id: String,
    pub parent_span_id: Option<String>,
    pub span_type: SpanType,
    pub name: String,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub status: SpanStatus,
    pub error_message: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub stop_reason: Option<String>,
    pub cache_read_tokens: Option<i64>,
    pub cache_write_tokens: Option<i64>,
    pub reasoning_tokens: Option<i64>,
    pub first_token_ms: Option<i64>,
    pub thinking: Option<String>,
    pub tool_uses: Vec<ToolUse>,
}

// ============================================================================
// DERIVED READ MODELS
// ============================================================================

/// Session rollup computed on read (no stored entity)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRollup {
    pub session_id: String,
    pub user_id: Option<String>,
    pub trace_count: i64,
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub total_duration_ms: i64,
    pub total_spans: i64,
    pub has_error: bool,
    pub has_active: bool,
    pub first_trace_at: i64,
    pub last_trace_at: i64,
}

/// Project-level aggregate stats over a time range
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_traces: i64,
    pub total_spans: i64,
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub avg_duration_ms: f64,
    /// Percentage of traces in error status, 0 when there are no traces
    pub error_rate: f64,
}

/// One daily usage bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBucket {
    /// UTC calendar date, `YYYY-MM-DD`
    pub date: String,
    pub traces: i64,
    pub spans: i64,
    pub tokens: i64,
    pub cost_usd: f64,
}

// ============================================================================
// JSON COLUMN HELPERS
// ============================================================================

/// Serialize an optional JSON value for a TEXT column
pub fn json_to_column(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

/// Deserialize a TEXT column into a JSON value; malformed text becomes None
pub fn column_to_json(text: Option<String>) -> Option<serde_json::Value> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}

/// Serialize a tag list for a TEXT column; empty lists store NULL
pub fn tags_to_column(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        serde_json::to_string(tags).ok()
    }
}

/// Deserialize a TEXT column into a tag list
pub fn column_to_tags(text: Option<String>) -> Vec<String> {
    text.and_then(|t| serde_json::from_str(&t).ok())
        .unwrap_or_default()
}

/// Serialize tool uses for a TEXT column; empty lists store NULL
pub fn tool_uses_to_column(tool_uses: &[ToolUse]) -> Option<String> {
    if tool_uses.is_empty() {
        None
    } else {
        serde_json::to_string(tool_uses).ok()
    }
}

/// Deserialize a TEXT column into tool uses
pub fn column_to_tool_uses(text: Option<String>) -> Vec<ToolUse> {
    text.and_then(|t| serde_json::from_str(&t).ok())
        .unwrap_or_default()
}
