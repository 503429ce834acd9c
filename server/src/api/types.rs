//! Shared API types: error responses, pagination, query parsing

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::data::DataError;
use crate::utils::time::parse_iso_millis;

/// Standard API error response
///
/// `Forbidden` intentionally does not exist: cross-tenant access renders as
/// `NotFound` so responses never reveal that a resource exists.
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    Unauthorized,
    NotFound,
    Conflict { code: String, message: String },
    RateLimited { retry_after_secs: u64 },
    Timeout,
    Internal,
    ServiceUnavailable { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn from_data(e: DataError) -> Self {
        match e {
            DataError::Timeout { .. } | DataError::Cancelled => {
                tracing::warn!(error = %e, "Read-path deadline exceeded");
                Self::Timeout
            }
            other => {
                tracing::error!(error = %other, "Data error");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message, retry_after) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message, None)
            }
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "UNAUTHORIZED".to_string(),
                "Invalid credentials".to_string(),
                None,
            ),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "NOT_FOUND".to_string(),
                "Resource not found".to_string(),
                None,
            ),
            Self::Conflict { code, message } => {
                (StatusCode::CONFLICT, "conflict", code, message, None)
            }
            Self::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "RATE_LIMITED".to_string(),
                "Too many requests".to_string(),
                Some(retry_after_secs),
            ),
            Self::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                "TIMEOUT".to_string(),
                "Request timed out".to_string(),
                None,
            ),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                "Internal server error".to_string(),
                None,
            ),
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "SERVICE_UNAVAILABLE".to_string(),
                message,
                None,
            ),
        };

        let mut response = (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response();

        if let Some(secs) = retry_after
            && let Ok(value) = HeaderValue::from_str(&secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response
    }
}

/// Parse an optional `from`/`to` query parameter: epoch milliseconds or
/// RFC 3339
pub fn parse_time_param(s: &Option<String>, name: &str) -> Result<Option<i64>, ApiError> {
    match s.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .or_else(|| parse_iso_millis(raw))
            .map(Some)
            .ok_or_else(|| {
                ApiError::bad_request(
                    "INVALID_TIMESTAMP",
                    format!(
                        "Invalid {} timestamp: use epoch milliseconds or RFC 3339",
                        name
                    ),
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_param() {
        assert_eq!(parse_time_param(&None, "from").unwrap(), None);
        assert_eq!(parse_time_param(&Some("".into()), "from").unwrap(), None);
        assert_eq!(
            parse_time_param(&Some("1704067200000".into()), "from").unwrap(),
            Some(1_704_067_200_000)
        );
        assert_eq!(
            parse_time_param(&Some("2024-01-01T00:00:00Z".into()), "from").unwrap(),
            Some(1_704_067_200_000)
        );
        assert!(parse_time_param(&Some("yesterday".into()), "from").is_err());
    }

    #[test]
    fn test_unauthorized_body_is_generic() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 30,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "30"
        );
    }

    #[test]
    fn test_data_error_mapping() {
        let timeout = ApiError::from_data(DataError::timeout(15));
        assert!(matches!(timeout, ApiError::Timeout));

        let cancelled = ApiError::from_data(DataError::Cancelled);
        assert!(matches!(cancelled, ApiError::Timeout));

        let storage = ApiError::from_data(DataError::Config("x".into()));
        assert!(matches!(storage, ApiError::Internal));
    }
}
