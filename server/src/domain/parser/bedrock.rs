//! Bedrock Converse API response parsing

use serde_json::{Map, Value};

use super::{ParsedResponse, SubType, i64_at, opt_i64_at};
use crate::data::types::ToolUse;

/// Parse a Bedrock Converse response body.
///
/// Content lives at `output.message.content[]`; tool blocks carry a
/// `toolUse` object. A tool block without a `toolUseId` gets a synthetic
/// `tool-<index>` id so downstream grouping stays stable.
pub fn parse(obj: &Map<String, Value>) -> ParsedResponse {
    let mut text = String::new();
    let mut tool_uses = Vec::new();

    let content = obj
        .get("output")
        .and_then(|o| o.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array());

    if let Some(blocks) = content {
        for block in blocks {
            if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
                text.push_str(t);
            }
            if let Some(tool) = block.get("toolUse") {
                let index = tool_uses.len();
                tool_uses.push(ToolUse {
                    id: tool
                        .get("toolUseId")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("tool-{}", index)),
                    name: tool
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    input: tool.get("input").cloned().unwrap_or(Value::Null),
                    output: None,
                    status: "pending".to_string(),
                    duration_ms: None,
                });
            }
        }
    }

    let (sub_type, output) = if tool_uses.is_empty() {
        (SubType::Response, Value::String(text))
    } else {
        let raw_content = content
            .map(|blocks| Value::Array(blocks.clone()))
            .unwrap_or(Value::Null);
        (SubType::Planning, raw_content)
    };

    ParsedResponse {
        output,
        input_tokens: i64_at(obj, "usage", "inputTokens"),
        output_tokens: i64_at(obj, "usage", "outputTokens"),
        cache_read_tokens: opt_i64_at(obj, "usage", "cacheReadInputTokens"),
        cache_write_tokens: opt_i64_at(obj, "usage", "cacheWriteInputTokens"),
        reasoning_tokens: None,
        stop_reason: obj
            .get("stopReason")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        thinking: None,
        tool_uses,
        sub_type,
    }
}
