//! Fixed-window request rate limiting
//!
//! In-memory per-key counters over one-minute windows, used on the auth
//! endpoints for brute-force protection. Counters live in a dashmap keyed by
//! client IP; stale windows are dropped opportunistically on access.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;

use crate::api::types::ApiError;
use crate::utils::time::now_millis;

const WINDOW_MS: i64 = 60_000;

/// One-minute fixed windows per key
pub struct RateLimiter {
    /// requests allowed per window; 0 disables the limiter
    limit: u32,
    windows: DashMap<String, (i64, u32)>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            limit: requests_per_minute,
            windows: DashMap::new(),
        }
    }

    /// Record a hit for a key. Returns `Err(retry_after_secs)` once the
    /// window budget is spent.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        if self.limit == 0 {
            return Ok(());
        }

        let now = now_millis();
        let window_start = now - now % WINDOW_MS;

        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert((window_start, 0));
        let (start, count) = *entry;

        if start != window_start {
            *entry = (window_start, 1);
            return Ok(());
        }

        if count >= self.limit {
            let retry_after_ms = window_start + WINDOW_MS - now;
            return Err((retry_after_ms / 1000).max(1) as u64);
        }

        *entry = (start, count + 1);
        Ok(())
    }

    /// Drop windows that ended before the current one
    pub fn prune(&self) {
        let current = now_millis() / WINDOW_MS * WINDOW_MS;
        self.windows.retain(|_, (start, _)| *start >= current);
    }
}

#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
}

/// Per-IP rate limit middleware (auth routes)
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_ip(&request, addr);

    if let Err(retry_after_secs) = state.limiter.check(&key) {
        tracing::warn!(ip = %key, "Rate limit exceeded");
        return Err(ApiError::RateLimited { retry_after_secs });
    }

    Ok(next.run(request).await)
}

/// Client IP: first X-Forwarded-For entry when present (trusted reverse
/// proxy deployments), else the socket address
fn client_ip(request: &Request, addr: SocketAddr) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_limit_enforced_within_window() {
        let limiter = RateLimiter::new(3);

        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").is_ok());
        }
        let retry_after = limiter.check("1.2.3.4").unwrap_err();
        assert!(retry_after >= 1 && retry_after <= 60);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
        assert!(limiter.check("a").is_err());
    }

    #[test]
    fn test_zero_limit_disables() {
        let limiter = RateLimiter::new(0);
        for _ in 0..1000 {
            assert!(limiter.check("a").is_ok());
        }
    }

    #[test]
    fn test_prune_keeps_current_window() {
        let limiter = RateLimiter::new(5);
        limiter.check("a").unwrap();
        limiter.prune();
        // Current window survives pruning
        assert_eq!(limiter.windows.len(), 1);
    }

    #[test]
    fn test_client_ip_from_socket() {
        let request = HttpRequest::builder()
            .uri("/login")
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "192.168.1.1:8080".parse().unwrap();
        assert_eq!(client_ip(&request, addr), "192.168.1.1");
    }

    #[test]
    fn test_client_ip_from_forwarded_header() {
        let request = HttpRequest::builder()
            .uri("/login")
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "192.168.1.1:8080".parse().unwrap();
        assert_eq!(client_ip(&request, addr), "10.0.0.1");
    }
}
