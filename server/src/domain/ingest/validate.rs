//! Per-event validation for the ingest wire format

use crate::core::constants::{
    MAX_DURATION_MS, MAX_METADATA_BYTES, MAX_MODEL_LENGTH, MAX_SESSION_ID_LENGTH, MAX_TAG_LENGTH,
    MAX_TAGS, MAX_TOKEN_COUNT, MAX_USER_ID_LENGTH,
};
use crate::data::types::SpanStatus;
use crate::domain::parser::Provider;

use super::IngestEvent;

/// Validate a single event. Returns the field-level message for the
/// per-index error list; events in the same request are independent.
pub fn validate_event(event: &IngestEvent) -> Result<(), String> {
    if Provider::parse(&event.provider).is_none() {
        return Err(format!(
            "provider must be one of openai, anthropic, gemini, bedrock, openrouter, unknown (got '{}')",
            event.provider
        ));
    }

    if event.model.is_empty() || event.model.len() > MAX_MODEL_LENGTH {
        return Err(format!(
            "model must be 1-{} characters",
            MAX_MODEL_LENGTH
        ));
    }

    if !(0..=MAX_TOKEN_COUNT).contains(&event.input_tokens) {
        return Err(format!(
            "inputTokens must be between 0 and {}",
            MAX_TOKEN_COUNT
        ));
    }
    if !(0..=MAX_TOKEN_COUNT).contains(&event.output_tokens) {
        return Err(format!(
            "outputTokens must be between 0 and {}",
            MAX_TOKEN_COUNT
        ));
    }

    if !(0..=MAX_DURATION_MS).contains(&event.duration_ms) {
        return Err(format!(
            "durationMs must be between 0 and {}",
            MAX_DURATION_MS
        ));
    }

    match SpanStatus::parse(&event.status) {
        Some(SpanStatus::Success) | Some(SpanStatus::Error) => {}
        _ => return Err("status must be 'success' or 'error'".to_string()),
    }

    if let Some(session_id) = &event.session_id
        && session_id.len() > MAX_SESSION_ID_LENGTH
    {
        return Err(format!(
            "sessionId must be at most {} characters",
            MAX_SESSION_ID_LENGTH
        ));
    }

    if let Some(user_id) = &event.user_id
        && user_id.len() > MAX_USER_ID_LENGTH
    {
        return Err(format!(
            "userId must be at most {} characters",
            MAX_USER_ID_LENGTH
        ));
    }

    if event.tags.len() > MAX_TAGS {
        return Err(format!("at most {} tags are allowed", MAX_TAGS));
    }
    for tag in &event.tags {
        if tag.len() > MAX_TAG_LENGTH {
            return Err(format!(
                "tags must be at most {} characters each",
                MAX_TAG_LENGTH
            ));
        }
    }

    if let Some(metadata) = &event.metadata {
        let size = serde_json::to_vec(metadata).map(|b| b.len()).unwrap_or(0);
        if size > MAX_METADATA_BYTES {
            return Err(format!(
                "metadata must serialize to at most {} bytes",
                MAX_METADATA_BYTES
            ));
        }
    }

    Ok(())
}
