//! Anthropic Messages API response parsing

use serde_json::{Map, Value};

use super::{ParsedResponse, SubType, i64_at, opt_i64_at};
use crate::data::types::ToolUse;

/// Parse an Anthropic Messages response body.
///
/// Text blocks join into the output string and thinking blocks into the
/// thinking string. Any `tool_use` block flips the response to planning, in
/// which case the raw content array itself becomes the output.
pub fn parse(obj: &Map<String, Value>) -> ParsedResponse {
    let mut text = String::new();
    let mut thinking = String::new();
    let mut tool_uses = Vec::new();

    let content = obj.get("content").and_then(|c| c.as_array());

    if let Some(blocks) = content {
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
                        text.push_str(t);
                    }
                }
                Some("thinking") => {
                    if let Some(t) = block.get("thinking").and_then(|t| t.as_str()) {
                        thinking.push_str(t);
                    }
                }
                Some("tool_use") => {
                    tool_uses.push(ToolUse {
                        id: block
                            .get("id")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        name: block
                            .get("name")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        input: block.get("input").cloned().unwrap_or(Value::Null),
                        output: None,
                        status: "pending".to_string(),
                        duration_ms: None,
                    });
                }
                _ => {}
            }
        }
    }

    let (sub_type, output) = if tool_uses.is_empty() {
        (SubType::Response, Value::String(text))
    } else {
        // Planning responses keep the raw block list so tool context survives
        let raw_content = content
            .map(|blocks| Value::Array(blocks.clone()))
            .unwrap_or(Value::Null);
        (SubType::Planning, raw_content)
    };

    ParsedResponse {
        output,
        input_tokens: i64_at(obj, "usage", "input_tokens"),
        output_tokens: i64_at(obj, "usage", "output_tokens"),
        cache_read_tokens: opt_i64_at(obj, "usage", "cache_read_input_tokens"),
        cache_write_tokens: opt_i64_at(obj, "usage", "cache_creation_input_tokens"),
        reasoning_tokens: None,
        stop_reason: obj
            .get("stop_reason")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        thinking: if thinking.is_empty() {
            None
        } else {
            Some(thinking)
        },
        tool_uses,
        sub_type,
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Provider, parse as parse_any};
    use super::*;
    use serde_json::json;

    fn run(raw: Value) -> ParsedResponse {
        parse_any(Provider::Anthropic, &raw).unwrap()
    }

    #[test]
    fn test_text_response() {
        let parsed = run(json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "text", "text": "world"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 4},
            "stop_reason": "end_turn"
        }));

        assert_eq!(parsed.output, json!("Hello, world"));
        assert_eq!(parsed.input_tokens, 12);
        assert_eq!(parsed.output_tokens, 4);
        assert_eq!(parsed.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(parsed.sub_type, SubType::Response);
        assert!(parsed.tool_uses.is_empty());
        assert!(parsed.thinking.is_none());
    }

    #[test]
    fn test_planning_response_keeps_raw_content() {
        let content = json!([
            {"type": "text", "text": "hi"},
            {"type": "tool_use", "id": "t1", "name": "f", "input": {}}
        ]);
        let parsed = run(json!({
            "content": content,
            "usage": {"input_tokens": 20, "output_tokens": 15},
            "stop_reason": "tool_use"
        }));

        assert_eq!(parsed.sub_type, SubType::Planning);
        assert_eq!(parsed.output, content);
        assert_eq!(parsed.tool_uses.len(), 1);
        assert_eq!(parsed.tool_uses[0].id, "t1");
        assert_eq!(parsed.tool_uses[0].name, "f");
        assert_eq!(parsed.tool_uses[0].input, json!({}));
        assert_eq!(parsed.tool_uses[0].status, "pending");
    }

    #[test]
    fn test_thinking_blocks() {
        let parsed = run(json!({
            "content": [
                {"type": "thinking", "thinking": "step one. "},
                {"type": "thinking", "thinking": "step two."},
                {"type": "text", "text": "answer"}
            ],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));

        assert_eq!(parsed.thinking.as_deref(), Some("step one. step two."));
        assert_eq!(parsed.output, json!("answer"));
    }

    #[test]
    fn test_cache_tokens() {
        let parsed = run(json!({
            "content": [],
            "usage": {
                "input_tokens": 100,
                "output_tokens": 50,
                "cache_read_input_tokens": 80,
                "cache_creation_input_tokens": 20
            }
        }));

        assert_eq!(parsed.cache_read_tokens, Some(80));
        assert_eq!(parsed.cache_write_tokens, Some(20));
    }

    #[test]
    fn test_cache_tokens_absent_stay_none() {
        let parsed = run(json!({
            "content": [],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));
        assert_eq!(parsed.cache_read_tokens, None);
        assert_eq!(parsed.cache_write_tokens, None);
    }

    #[test]
    fn test_malformed_blocks_are_skipped() {
        let parsed = run(json!({
            "content": [
                {"type": "text", "text": 42},
                {"no_type": true},
                {"type": "image", "source": "..."},
                {"type": "text", "text": "ok"}
            ],
            "usage": {"input_tokens": "not-a-number", "output_tokens": null}
        }));

        assert_eq!(parsed.output, json!("ok"));
        assert_eq!(parsed.input_tokens, 0);
        assert_eq!(parsed.output_tokens, 0);
    }

    #[test]
    fn test_tool_use_missing_fields_default() {
        let parsed = run(json!({
            "content": [{"type": "tool_use"}],
            "usage": {}
        }));

        assert_eq!(parsed.tool_uses.len(), 1);
        assert_eq!(parsed.tool_uses[0].id, "");
        assert_eq!(parsed.tool_uses[0].name, "");
        assert_eq!(parsed.tool_uses[0].input, Value::Null);
        assert_eq!(parsed.sub_type, SubType::Planning);
    }
}
