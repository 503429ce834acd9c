//! Asynchronous ingestion pipeline
//!
//! The HTTP handler validates events and hands them to a bounded queue; a
//! fixed worker pool drains the queue and upserts traces and spans. The
//! queue is the only hand-off between the two sides, so a slow store
//! back-pressures ingestion instead of growing memory.

mod validate;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, watch};

use crate::core::config::IngestConfig;
use crate::core::constants::ENQUEUE_WAIT_MS;
use crate::core::shutdown::ShutdownService;
use crate::data::Store;
use crate::domain::pricing::PricingTable;

pub use validate::validate_event;

use worker::{SessionLocks, run_worker};

// ============================================================================
// WIRE TYPES
// ============================================================================

/// One provider call, as submitted by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEvent {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub input: Option<serde_json::Value>,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub output_tokens: i64,
    #[serde(default)]
    pub duration_ms: i64,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_stack: Option<String>,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional client timestamp (RFC 3339), marking the span start
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Raw provider response; when present, parsed extended fields override
    /// the verbatim ones below
    #[serde(default)]
    pub raw_response: Option<serde_json::Value>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub cache_read_tokens: Option<i64>,
    #[serde(default)]
    pub cache_write_tokens: Option<i64>,
    #[serde(default)]
    pub reasoning_tokens: Option<i64>,
    #[serde(default)]
    pub first_token_ms: Option<i64>,
    #[serde(default)]
    pub thinking: Option<String>,
}

/// Ingest request body: 1..100 events
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub events: Vec<IngestEvent>,
}

/// Per-index rejection inside a 207 response
#[derive(Debug, Clone, Serialize)]
pub struct IngestEventError {
    pub index: usize,
    pub message: String,
}

/// Ingest outcome: `success` is true iff every event was validated and
/// accepted onto the queue
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub processed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IngestEventError>,
}

/// A validated event bound to its project, queued for a worker
#[derive(Debug)]
pub struct IngestJob {
    pub project_id: String,
    pub event: IngestEvent,
}

// ============================================================================
// SERVICE
// ============================================================================

/// Front half of the pipeline: validation and bounded enqueue
pub struct IngestionService {
    tx: mpsc::Sender<IngestJob>,
    shutdown_rx: watch::Receiver<bool>,
}

impl IngestionService {
    /// Spawn the worker pool and return the enqueue handle. Worker tasks are
    /// registered with the shutdown service so the queue drains before the
    /// store closes.
    pub async fn start(
        store: Arc<Store>,
        pricing: Arc<PricingTable>,
        config: &IngestConfig,
        shutdown: &ShutdownService,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let locks: Arc<SessionLocks> = Arc::new(DashMap::new());

        for worker_id in 0..config.workers {
            let handle = tokio::spawn(run_worker(
                worker_id,
                store.clone(),
                pricing.clone(),
                locks.clone(),
                rx.clone(),
                shutdown.subscribe(),
            ));
            shutdown.register(handle).await;
        }

        tracing::debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Ingestion service started"
        );

        Arc::new(Self {
            tx,
            shutdown_rx: shutdown.subscribe(),
        })
    }

    /// Validate and enqueue a batch of events.
    ///
    /// Invalid events are rejected per index while the rest proceed. Enqueue
    /// waits at most [`ENQUEUE_WAIT_MS`] per event; a full queue rejects the
    /// remaining events rather than blocking the caller.
    pub async fn ingest(&self, project_id: &str, request: IngestRequest) -> IngestResponse {
        let mut errors = Vec::new();
        let mut processed = 0usize;
        let draining = *self.shutdown_rx.borrow();

        for (index, event) in request.events.into_iter().enumerate() {
            if let Err(message) = validate_event(&event) {
                errors.push(IngestEventError { index, message });
                continue;
            }

            if draining {
                errors.push(IngestEventError {
                    index,
                    message: "server is shutting down".to_string(),
                });
                continue;
            }

            let job = IngestJob {
                project_id: project_id.to_string(),
                event,
            };
            match tokio::time::timeout(Duration::from_millis(ENQUEUE_WAIT_MS), self.tx.send(job))
                .await
            {
                Ok(Ok(())) => processed += 1,
                _ => errors.push(IngestEventError {
                    index,
                    message: "ingestion queue full, retry later".to_string(),
                }),
            }
        }

        IngestResponse {
            success: errors.is_empty(),
            processed,
            errors,
        }
    }

    /// Build a service whose queue has no consumers (queue-overflow tests)
    #[cfg(test)]
    fn detached(
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<IngestJob>, watch::Sender<bool>) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (Self { tx, shutdown_rx }, rx, shutdown_tx)
    }
}
