//! Provider response normalization
//!
//! A total parsing layer that turns provider-specific response JSON into a
//! uniform [`ParsedResponse`]. Missing or wrongly-typed subfields yield zero
//! values; only a non-object top-level input fails, and then by returning
//! `None` rather than an error. Ingestion always proceeds.

mod anthropic;
mod bedrock;
mod gemini;
mod openai;

use serde::{Deserialize, Serialize};

use crate::data::types::ToolUse;

/// Wire-format provider names accepted on ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Openai,
    Anthropic,
    Gemini,
    Bedrock,
    Openrouter,
    Unknown,
}

impl Provider {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openai" => Some(Self::Openai),
            "anthropic" => Some(Self::Anthropic),
            "gemini" => Some(Self::Gemini),
            "bedrock" => Some(Self::Bedrock),
            "openrouter" => Some(Self::Openrouter),
            "unknown" | "" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Bedrock => "bedrock",
            Self::Openrouter => "openrouter",
            Self::Unknown => "unknown",
        }
    }
}

/// Whether the response's primary payload is tool invocations or text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubType {
    Planning,
    Response,
}

/// Uniform shape extracted from any provider response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Joined text, or the raw content block array for planning responses
    pub output: serde_json::Value,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: Option<i64>,
    pub cache_write_tokens: Option<i64>,
    pub reasoning_tokens: Option<i64>,
    pub stop_reason: Option<String>,
    pub thinking: Option<String>,
    pub tool_uses: Vec<ToolUse>,
    pub sub_type: SubType,
}

/// Normalize a raw provider response.
///
/// `Unknown` (or openrouter payloads that are OpenAI-shaped on the wire but
/// tagged otherwise upstream) goes through shape detection. Returns `None`
/// only when the top level is not a JSON object.
pub fn parse(provider: Provider, raw: &serde_json::Value) -> Option<ParsedResponse> {
    let obj = raw.as_object()?;

    let parsed = match provider {
        Provider::Anthropic => anthropic::parse(obj),
        Provider::Bedrock => bedrock::parse(obj),
        // OpenRouter speaks the Chat Completions format
        Provider::Openai | Provider::Openrouter => openai::parse(obj),
        Provider::Gemini => gemini::parse(obj),
        Provider::Unknown => return detect_and_parse(obj),
    };

    Some(parsed)
}

/// Shape probes, in order: Anthropic, Bedrock, OpenAI, Gemini
fn detect_and_parse(obj: &serde_json::Map<String, serde_json::Value>) -> Option<ParsedResponse> {
    let has_anthropic_usage = obj
        .get("usage")
        .and_then(|u| u.get("input_tokens"))
        .is_some();

    if obj.get("content").is_some_and(|c| c.is_array()) && has_anthropic_usage {
        return Some(anthropic::parse(obj));
    }
    if obj.get("output").is_some_and(|o| o.get("message").is_some()) {
        return Some(bedrock::parse(obj));
    }
    if obj.get("choices").is_some_and(|c| c.is_array()) {
        return Some(openai::parse(obj));
    }
    if obj.get("candidates").is_some_and(|c| c.is_array()) {
        return Some(gemini::parse(obj));
    }

    None
}

/// `.get(path).as_i64()` with zero default, shared by the provider modules
fn i64_at(obj: &serde_json::Map<String, serde_json::Value>, outer: &str, inner: &str) -> i64 {
    obj.get(outer)
        .and_then(|o| o.get(inner))
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}

/// Like [`i64_at`] but distinguishing absent from zero
fn opt_i64_at(
    obj: &serde_json::Map<String, serde_json::Value>,
    outer: &str,
    inner: &str,
) -> Option<i64> {
    obj.get(outer).and_then(|o| o.get(inner)).and_then(|v| v.as_i64())
}
