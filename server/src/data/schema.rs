//! SQLite schema definitions
//!
//! Initial schema with all tables. Timestamps are epoch milliseconds.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL
);

-- =============================================================================
-- 1. Users
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE CHECK(length(email) >= 3),
    password_hash TEXT NOT NULL,
    name TEXT CHECK(name IS NULL OR length(name) <= 100),
    created_at INTEGER NOT NULL
);

-- =============================================================================
-- 2. Projects (one active API key per project, stored hashed)
-- =============================================================================
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK(length(name) >= 1 AND length(name) <= 100),
    owner_email TEXT NOT NULL REFERENCES users(email) ON DELETE CASCADE,
    api_key_hash TEXT NOT NULL UNIQUE,
    api_key_prefix TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_email);

-- =============================================================================
-- 3. Traces
-- =============================================================================
CREATE TABLE IF NOT EXISTS traces (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    session_id TEXT,
    user_id TEXT,
    status TEXT NOT NULL CHECK(status IN ('active', 'completed', 'error')),
    total_tokens INTEGER NOT NULL DEFAULT 0,
    total_cost_usd REAL NOT NULL DEFAULT 0,
    total_duration_ms INTEGER NOT NULL DEFAULT 0,
    total_spans INTEGER NOT NULL DEFAULT 0,
    metadata TEXT,
    tags TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_traces_project_created ON traces(project_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_traces_project_session ON traces(project_id, session_id);

-- =============================================================================
-- 4. Spans
-- =============================================================================
CREATE TABLE IF NOT EXISTS spans (
    id TEXT PRIMARY KEY,
    trace_id TEXT NOT NULL REFERENCES traces(id) ON DELETE CASCADE,
    parent_span_id TEXT,
    type TEXT NOT NULL CHECK(type IN (
        'llm', 'agent', 'tool', 'retrieval', 'embedding', 'guardrail', 'rerank', 'custom'
    )),
    name TEXT NOT NULL,
    input TEXT,
    output TEXT,
    input_tokens INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    cost_usd REAL NOT NULL DEFAULT 0,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL CHECK(status IN ('pending', 'success', 'error')),
    error_message TEXT,
    model TEXT,
    provider TEXT,
    metadata TEXT,
    started_at INTEGER NOT NULL,
    ended_at INTEGER,
    stop_reason TEXT,
    cache_read_tokens INTEGER,
    cache_write_tokens INTEGER,
    reasoning_tokens INTEGER,
    first_token_ms INTEGER,
    thinking TEXT,
    tool_uses TEXT
);

CREATE INDEX IF NOT EXISTS idx_spans_trace ON spans(trace_id);

-- =============================================================================
-- Schema version row
-- =============================================================================
INSERT OR IGNORE INTO schema_version (id, version, applied_at)
VALUES (1, 1, CAST(strftime('%s', 'now') AS INTEGER) * 1000);
"#;
