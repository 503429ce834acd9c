//! OpenAI Chat Completions response parsing

use serde_json::{Map, Value};

use super::{ParsedResponse, SubType, i64_at};
use crate::data::types::ToolUse;

/// Parse a Chat Completions response body.
///
/// Only the first choice is considered. Tool call arguments arrive as a JSON
/// string and are kept verbatim rather than re-parsed; a call without an id
/// gets a synthetic `call-<index>`.
pub fn parse(obj: &Map<String, Value>) -> ParsedResponse {
    let choice = obj
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first());

    let message = choice.and_then(|c| c.get("message"));

    let text = message
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();

    let mut tool_uses = Vec::new();
    if let Some(calls) = message
        .and_then(|m| m.get("tool_calls"))
        .and_then(|t| t.as_array())
    {
        for (index, call) in calls.iter().enumerate() {
            let function = call.get("function");
            tool_uses.push(ToolUse {
                id: call
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("call-{}", index)),
                name: function
                    .and_then(|f| f.get("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                input: function
                    .and_then(|f| f.get("arguments"))
                    .cloned()
                    .unwrap_or(Value::Null),
                output: None,
                status: "pending".to_string(),
                duration_ms: None,
            });
        }
    }

    let sub_type = if tool_uses.is_empty() {
        SubType::Response
    } else {
        SubType::Planning
    };

    let reasoning_tokens = obj
        .get("usage")
        .and_then(|u| u.get("completion_tokens_details"))
        .and_then(|d| d.get("reasoning_tokens"))
        .and_then(|v| v.as_i64());

    ParsedResponse {
        output: Value::String(text),
        input_tokens: i64_at(obj, "usage", "prompt_tokens"),
        output_tokens: i64_at(obj, "usage", "completion_tokens"),
        cache_read_tokens: None,
        cache_write_tokens: None,
        reasoning_tokens,
        stop_reason: choice
            .and_then(|c| c.get("finish_reason"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        thinking: None,
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
        parse_any(Provider::Openai, &raw).unwrap()
    }

    #[test]
    fn test_text_response() {
        let parsed = run(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Hello there"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 15, "completion_tokens": 3}
        }));

        assert_eq!(parsed.output, json!("Hello there"));
        assert_eq!(parsed.input_tokens, 15);
        assert_eq!(parsed.output_tokens, 3);
        assert_eq!(parsed.stop_reason.as_deref(), Some("stop"));
        assert_eq!(parsed.sub_type, SubType::Response);
    }

    #[test]
    fn test_tool_calls_with_synthetic_id() {
        let parsed = run(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "a", "function": {"name": "x", "arguments": "{}"}},
                        {"function": {"name": "y", "arguments": "{}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 40, "completion_tokens": 22}
        }));

        assert_eq!(parsed.tool_uses.len(), 2);
        assert_eq!(parsed.tool_uses[0].id, "a");
        assert_eq!(parsed.tool_uses[0].name, "x");
        assert_eq!(parsed.tool_uses[1].id, "call-1");
        assert_eq!(parsed.tool_uses[1].name, "y");
        assert_eq!(parsed.sub_type, SubType::Planning);
        assert_eq!(parsed.stop_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn test_arguments_kept_verbatim() {
        let parsed = run(json!({
            "choices": [{
                "message": {"tool_calls": [
                    {"id": "a", "function": {"name": "x", "arguments": "{\"q\": \"rust\"}"}}
                ]}
            }]
        }));

        // The arguments string is not re-parsed into an object
        assert_eq!(parsed.tool_uses[0].input, json!("{\"q\": \"rust\"}"));
    }

    #[test]
    fn test_reasoning_tokens() {
        let parsed = run(json!({
            "choices": [{"message": {"content": "done"}, "finish_reason": "stop"}],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 100,
                "completion_tokens_details": {"reasoning_tokens": 64}
            }
        }));

        assert_eq!(parsed.reasoning_tokens, Some(64));
    }

    #[test]
    fn test_reasoning_tokens_absent() {
        let parsed = run(json!({
            "choices": [{"message": {"content": "x"}}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1}
        }));
        assert_eq!(parsed.reasoning_tokens, None);
    }

    #[test]
    fn test_empty_choices() {
        let parsed = run(json!({"choices": [], "usage": {"prompt_tokens": 2}}));
        assert_eq!(parsed.output, json!(""));
        assert_eq!(parsed.input_tokens, 2);
        assert!(parsed.stop_reason.is_none());
    }

    #[test]
    fn test_null_content_with_no_tools() {
        let parsed = run(json!({
            "choices": [{"message": {"content": null}, "finish_reason": "stop"}]
        }));
        assert_eq!(parsed.output, json!(""));
        assert_eq!(parsed.sub_type, SubType::Response);
    }
}
