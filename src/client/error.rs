//! Typed errors for query transport failures
//!
//! Only transport-level failures become user-visible errors; malformed frames
//! are dropped by the decoder and cancellation is an informational outcome,
//! not an error. Variants are mapped from HTTP status so callers can tell a
//! bad credential from a throttled key without string matching.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Credential rejected (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Tenant or key over its rate limit (HTTP 429).
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request (HTTP 400), including an empty query text.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side failure (HTTP 5xx).
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Connection-level failure (DNS, refused connection, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// A 2xx streaming response that closed without delivering any frame.
    #[error("event stream ended without delivering any frames")]
    EmptyStream,

    /// Anything else.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl QueryError {
    /// Whether retrying (possibly after a delay or credential refresh) could
    /// plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QueryError::Unauthorized(_)
                | QueryError::RateLimited(_)
                | QueryError::ServiceError(_)
                | QueryError::Network(_)
        )
    }

    /// Map an HTTP status plus eagerly-read body text into a typed error.
    ///
    /// The status code is kept in the message so it survives into the
    /// session's `error_detail`.
    pub fn from_http_status(status: reqwest::StatusCode, body: String) -> Self {
        let detail = format!("HTTP {}: {}", status.as_u16(), body);
        match status.as_u16() {
            401 => QueryError::Unauthorized(detail),
            429 => QueryError::RateLimited(detail),
            400 => QueryError::BadRequest(detail),
            500..=599 => QueryError::ServiceError(detail),
            _ => QueryError::Other(anyhow::anyhow!(detail)),
        }
    }

    /// Map a reqwest transport error into a typed error.
    pub fn from_network_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QueryError::Network(format!("request timeout: {err}"))
        } else if err.is_connect() {
            QueryError::Network(format!("connection failed: {err}"))
        } else if let Some(status) = err.status() {
            Self::from_http_status(status, err.to_string())
        } else {
            QueryError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_variants() {
        let err = QueryError::from_http_status(
            reqwest::StatusCode::UNAUTHORIZED,
            "bad key".to_string(),
        );
        assert!(matches!(err, QueryError::Unauthorized(_)));

        let err = QueryError::from_http_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down".to_string(),
        );
        assert!(matches!(err, QueryError::RateLimited(_)));

        let err = QueryError::from_http_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "boom".to_string(),
        );
        assert!(matches!(err, QueryError::ServiceError(_)));
    }

    #[test]
    fn message_keeps_status_and_body() {
        let err = QueryError::from_http_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "upstream exploded".to_string(),
        );
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("upstream exploded"));
    }

    #[test]
    fn service_errors_are_retryable_bad_requests_are_not() {
        let err =
            QueryError::from_http_status(reqwest::StatusCode::BAD_GATEWAY, "".to_string());
        assert!(err.is_retryable());

        let err = QueryError::BadRequest("empty query".to_string());
        assert!(!err.is_retryable());

        assert!(!QueryError::EmptyStream.is_retryable());
    }
}
