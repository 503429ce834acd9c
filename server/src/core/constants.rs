//! Application-wide constants and environment variable names

/// Application name (lowercase, used in default log filter)
pub const APP_NAME_LOWER: &str = "lumetrace";

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

pub const ENV_HOST: &str = "LUMETRACE_HOST";
pub const ENV_PORT: &str = "LUMETRACE_PORT";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_LOG: &str = "LUMETRACE_LOG";
pub const ENV_LOG_FORMAT: &str = "LUMETRACE_LOG_FORMAT";
pub const ENV_JWT_SECRET: &str = "LUMETRACE_JWT_SECRET";
pub const ENV_API_KEY_SECRET: &str = "LUMETRACE_API_KEY_SECRET";
pub const ENV_TOKEN_EXPIRATION_HOURS: &str = "LUMETRACE_TOKEN_EXPIRATION_HOURS";
pub const ENV_FRONTEND_URL: &str = "LUMETRACE_FRONTEND_URL";
pub const ENV_WORKERS: &str = "LUMETRACE_WORKERS";
pub const ENV_QUEUE_CAPACITY: &str = "LUMETRACE_QUEUE_CAPACITY";
pub const ENV_MAX_BODY_BYTES: &str = "LUMETRACE_MAX_BODY_BYTES";
pub const ENV_RATE_LIMIT_AUTH_RPM: &str = "LUMETRACE_RATE_LIMIT_AUTH_RPM";
pub const ENV_OAUTH_CLIENT_ID: &str = "LUMETRACE_OAUTH_CLIENT_ID";
pub const ENV_OAUTH_CLIENT_SECRET: &str = "LUMETRACE_OAUTH_CLIENT_SECRET";

// ============================================================================
// SERVER DEFAULTS
// ============================================================================

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7420;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://lumetrace.db";

/// Max request body size for ingest and dashboard routes (bytes)
pub const DEFAULT_BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Deadline applied to store queries on the read path (seconds)
pub const READ_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// INGESTION
// ============================================================================

/// Worker tasks draining the ingestion queue
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Bounded queue capacity (jobs)
pub const DEFAULT_QUEUE_CAPACITY: usize = 1_000;

/// Maximum time the HTTP handler waits for queue space (milliseconds)
pub const ENQUEUE_WAIT_MS: u64 = 100;

/// Maximum events per ingest request
pub const MAX_EVENTS_PER_REQUEST: usize = 100;

/// Token count ceiling per event field
pub const MAX_TOKEN_COUNT: i64 = 10_000_000;

/// Duration ceiling per event (24h in milliseconds)
pub const MAX_DURATION_MS: i64 = 86_400_000;

pub const MAX_MODEL_LENGTH: usize = 100;
pub const MAX_SESSION_ID_LENGTH: usize = 255;
pub const MAX_USER_ID_LENGTH: usize = 255;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LENGTH: usize = 50;

/// Serialized size ceiling for a single event's metadata map (bytes).
/// Depth is unbounded; only the total payload is capped.
pub const MAX_METADATA_BYTES: usize = 65_536;

/// Storage retry schedule for the ingestion worker (milliseconds).
/// One initial attempt plus one retry per entry.
pub const WORKER_RETRY_DELAYS_MS: [u64; 3] = [25, 100, 400];

/// Queue drain deadline on shutdown (seconds)
pub const DRAIN_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// AUTH
// ============================================================================

/// API key prefix on the wire: `le_<base62>`
pub const API_KEY_PREFIX: &str = "le_";

/// Random base62 characters after the prefix
pub const API_KEY_RANDOM_LENGTH: usize = 40;

/// Display hint length (non-secret prefix shown in the dashboard)
pub const API_KEY_PREFIX_DISPLAY_LEN: usize = 11;

pub const DEFAULT_TOKEN_EXPIRATION_HOURS: u64 = 24 * 7;

/// Per-IP request budget for auth routes (requests per minute)
pub const DEFAULT_RATE_LIMIT_AUTH_RPM: u32 = 30;

// ============================================================================
// READ PATH
// ============================================================================

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 200;

/// Graceful shutdown deadline for background tasks (seconds)
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 15;
