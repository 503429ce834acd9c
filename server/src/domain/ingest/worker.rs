//! Ingestion worker: queue consumption and the per-job upsert transaction

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc, watch};

use super::IngestJob;
use crate::core::constants::{DRAIN_TIMEOUT_SECS, WORKER_RETRY_DELAYS_MS};
use crate::data::repositories::{span, trace};
use crate::data::types::{SpanRow, SpanStatus, SpanType, TraceRow, TraceStatus};
use crate::data::{DataError, Store};
use crate::domain::parser::{self, ParsedResponse, Provider};
use crate::domain::pricing::{PricingTable, round_micro_usd};
use crate::utils::crypto::sha256_hex;
use crate::utils::retry::retry_with_schedule;
use crate::utils::time::{now_millis, parse_iso_millis};

/// Per-`(project, session)` mutexes serializing trace-update transactions
pub(super) type SessionLocks = DashMap<(String, String), Arc<Mutex<()>>>;

/// Shared receiver side of the bounded job queue
pub(super) type SharedReceiver = Arc<Mutex<mpsc::Receiver<IngestJob>>>;

/// Worker loop: consume jobs until shutdown, then drain under a deadline.
pub(super) async fn run_worker(
    worker_id: usize,
    store: Arc<Store>,
    pricing: Arc<PricingTable>,
    locks: Arc<SessionLocks>,
    rx: SharedReceiver,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::debug!(worker_id, "Ingestion worker started");

    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
            job = recv_next(&rx) => {
                match job {
                    Some(job) => job,
                    None => {
                        tracing::debug!(worker_id, "Ingestion queue closed");
                        return;
                    }
                }
            }
        };

        process_job(&store, &pricing, &locks, job).await;
    }

    // Drain phase: finish what is already queued, refuse the rest once the
    // deadline passes.
    let deadline = Instant::now() + Duration::from_secs(DRAIN_TIMEOUT_SECS);
    loop {
        if Instant::now() >= deadline {
            tracing::warn!(worker_id, "Drain deadline reached; queued events dropped");
            break;
        }
        match tokio::time::timeout(Duration::from_millis(100), recv_next(&rx)).await {
            Ok(Some(job)) => process_job(&store, &pricing, &locks, job).await,
            Ok(None) => break,
            Err(_) => break,
        }
    }

    tracing::debug!(worker_id, "Ingestion worker stopped");
}

async fn recv_next(rx: &SharedReceiver) -> Option<IngestJob> {
    rx.lock().await.recv().await
}

/// Process one job: serialize on the session key, then upsert with bounded
/// retries. Ingestion is best-effort; an exhausted retry schedule drops the
/// event with a log line carrying the project and a payload hash, never the
/// payload.
pub(super) async fn process_job(
    store: &Store,
    pricing: &PricingTable,
    locks: &SessionLocks,
    job: IngestJob,
) {
    let session_key = job
        .event
        .session_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| (job.project_id.clone(), s.to_string()));

    let lock = session_key.as_ref().map(|key| {
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    });
    let guard = match &lock {
        Some(lock) => Some(lock.lock().await),
        None => None,
    };

    let result = retry_with_schedule(&WORKER_RETRY_DELAYS_MS, DataError::is_transient, || {
        apply_event(store, pricing, &job)
    })
    .await;

    drop(guard);
    drop(lock);
    if let Some(key) = &session_key {
        // Drop the map entry once nothing else holds it; the shard lock makes
        // the count check and removal atomic against new clones.
        locks.remove_if(key, |_, v| Arc::strong_count(v) == 1);
    }

    match result {
        Ok((trace_id, attempts)) => {
            if attempts > 1 {
                tracing::debug!(trace_id = %trace_id, attempts, "Event stored after retry");
            }
        }
        Err((e, attempts)) => {
            let payload_hash = sha256_hex(
                &serde_json::to_string(&job.event).unwrap_or_default(),
            );
            tracing::warn!(
                project_id = %job.project_id,
                payload_hash = %payload_hash,
                attempts,
                error = %e,
                "Dropping event after exhausted retries"
            );
        }
    }
}

/// The per-job upsert transaction: trace upsert, span insert, aggregate
/// update, committed atomically
async fn apply_event(
    store: &Store,
    pricing: &PricingTable,
    job: &IngestJob,
) -> Result<String, DataError> {
    let event = &job.event;
    let received_at = now_millis();

    // Client timestamp marks the span start; otherwise anchor the span so it
    // ends at receipt time.
    let started_at = event
        .timestamp
        .as_deref()
        .and_then(parse_iso_millis)
        .unwrap_or(received_at - event.duration_ms);
    let ended_at = started_at + event.duration_ms;

    // Raw-response extraction: extended fields from the parser win over any
    // equivalents supplied verbatim on the event.
    let provider = Provider::parse(&event.provider).unwrap_or(Provider::Unknown);
    let parsed: Option<ParsedResponse> = event
        .raw_response
        .as_ref()
        .and_then(|raw| parser::parse(provider, raw));

    let (input_tokens, output_tokens) = match &parsed {
        // Explicit counts win; parsed counts only fill in missing ones
        Some(p) if event.input_tokens == 0 && event.output_tokens == 0 => {
            (p.input_tokens, p.output_tokens)
        }
        _ => (event.input_tokens, event.output_tokens),
    };

    let stop_reason = parsed
        .as_ref()
        .and_then(|p| p.stop_reason.clone())
        .or_else(|| event.stop_reason.clone());
    let cache_read_tokens = parsed
        .as_ref()
        .and_then(|p| p.cache_read_tokens)
        .or(event.cache_read_tokens);
    let cache_write_tokens = parsed
        .as_ref()
        .and_then(|p| p.cache_write_tokens)
        .or(event.cache_write_tokens);
    let reasoning_tokens = parsed
        .as_ref()
        .and_then(|p| p.reasoning_tokens)
        .or(event.reasoning_tokens);
    let thinking = parsed
        .as_ref()
        .and_then(|p| p.thinking.clone())
        .or_else(|| event.thinking.clone());
    let tool_uses = parsed
        .as_ref()
        .map(|p| p.tool_uses.clone())
        .unwrap_or_default();
    let output = match (&event.output, &parsed) {
        (Some(out), _) => Some(out.clone()),
        (None, Some(p)) if !p.output.is_null() => Some(p.output.clone()),
        _ => None,
    };

    let span_status = match SpanStatus::parse(&event.status) {
        Some(status) => status,
        None => SpanStatus::Error,
    };

    let cost = pricing.cost_usd(&event.model, input_tokens, output_tokens);

    let session_id = event.session_id.as_deref().filter(|s| !s.is_empty());

    let mut tx = store.pool().begin().await?;

    // Trace upsert: session events coalesce into their session's trace, any
    // status; sessionless events always open a fresh trace.
    let existing = match session_id {
        Some(sid) => trace::find_trace_for_session(&mut *tx, &job.project_id, sid).await?,
        None => None,
    };

    let trace_row = match existing {
        Some(t) => t,
        None => {
            let t = TraceRow {
                id: cuid2::create_id(),
                project_id: job.project_id.clone(),
                session_id: session_id.map(str::to_string),
                user_id: event.user_id.clone(),
                status: TraceStatus::Active,
                total_tokens: 0,
                total_cost_usd: 0.0,
                total_duration_ms: 0,
                total_spans: 0,
                metadata: event.metadata.clone(),
                tags: event.tags.clone(),
                created_at: started_at,
                updated_at: started_at,
            };
            trace::insert_trace(&mut *tx, &t).await?;
            t
        }
    };

    let span_row = SpanRow {
        id: cuid2::create_id(),
        trace_id: trace_row.id.clone(),
        parent_span_id: None,
        span_type: SpanType::Llm,
        name: event.model.clone(),
        input: event.input.clone(),
        output,
        input_tokens,
        output_tokens,
        cost_usd: cost.cost_usd,
        duration_ms: event.duration_ms,
        status: span_status,
        error_message: event.error_message.clone(),
        model: Some(event.model.clone()),
        provider: Some(provider.as_str().to_string()),
        metadata: span_metadata(event),
        started_at,
        ended_at: Some(ended_at),
        stop_reason,
        cache_read_tokens,
        cache_write_tokens,
        reasoning_tokens,
        first_token_ms: event.first_token_ms,
        thinking,
        tool_uses,
    };
    span::insert_span(&mut *tx, &span_row).await?;

    let pending = span::count_pending_spans(&mut *tx, &trace_row.id).await?;
    let status = if span_status == SpanStatus::Error || trace_row.status == TraceStatus::Error {
        TraceStatus::Error
    } else if pending == 0 {
        TraceStatus::Completed
    } else {
        TraceStatus::Active
    };

    trace::update_trace_aggregates(
        &mut *tx,
        &trace_row.id,
        trace_row.total_tokens + input_tokens + output_tokens,
        round_micro_usd(trace_row.total_cost_usd + cost.cost_usd),
        trace_row
            .total_duration_ms
            .max(ended_at - trace_row.created_at),
        trace_row.total_spans + 1,
        status,
        received_at,
    )
    .await?;

    tx.commit().await?;
    Ok(trace_row.id)
}

/// Span metadata: the event's metadata map, with streaming and error-stack
/// context folded in when present
fn span_metadata(event: &super::IngestEvent) -> Option<serde_json::Value> {
    let mut map = match &event.metadata {
        Some(serde_json::Value::Object(m)) => m.clone(),
        Some(other) => {
            // Non-object metadata passes through untouched
            return Some(other.clone());
        }
        None => serde_json::Map::new(),
    };

    if event.streaming {
        map.insert("streaming".to_string(), serde_json::Value::Bool(true));
    }
    if let Some(stack) = &event.error_stack {
        map.insert(
            "errorStack".to_string(),
            serde_json::Value::String(stack.clone()),
        );
    }

    if map.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(map))
    }
}
