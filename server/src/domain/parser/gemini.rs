//! Gemini GenerateContent response parsing

use serde_json::{Map, Value};

use super::{ParsedResponse, SubType, i64_at, opt_i64_at};
use crate::data::types::ToolUse;

/// Parse a GenerateContent response body.
///
/// Only the first candidate is considered. Function-call parts have no
/// provider id, so each gets a synthetic `gemini-fc-<name>-<index>`.
pub fn parse(obj: &Map<String, Value>) -> ParsedResponse {
    let candidate = obj
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first());

    let parts = candidate
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let mut text = String::new();
    let mut tool_uses = Vec::new();

    if let Some(parts) = parts {
        for part in parts {
            if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                text.push_str(t);
            }
            if let Some(call) = part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let index = tool_uses.len();
                tool_uses.push(ToolUse {
                    id: format!("gemini-fc-{}-{}", name, index),
                    name,
                    input: call.get("args").cloned().unwrap_or(Value::Null),
                    output: None,
                    status: "pending".to_string(),
                    duration_ms: None,
                });
            }
        }
    }

    let sub_type = if tool_uses.is_empty() {
        SubType::Response
    } else {
        SubType::Planning
    };

    ParsedResponse {
        output: Value::String(text),
        input_tokens: i64_at(obj, "usageMetadata", "promptTokenCount"),
        output_tokens: i64_at(obj, "usageMetadata", "candidatesTokenCount"),
        cache_read_tokens: opt_i64_at(obj, "usageMetadata", "cachedContentTokenCount"),
        cache_write_tokens: None,
        reasoning_tokens: opt_i64_at(obj, "usageMetadata", "thoughtsTokenCount"),
        stop_reason: candidate
            .and_then(|c| c.get("finishReason"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        thinking: None,
        tool_uses,
        sub_type,
    }
}
