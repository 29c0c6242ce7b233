//! Classified errors for catalog requests.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single catalog request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure: connection refused, DNS, reset, unreadable body.
    #[error("connection error: {0}")]
    Connection(String),

    /// No complete response within the request timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Server answered with a non-success status.
    #[error("request failed with status: {0}")]
    Status(u16),

    /// Response body did not have the expected shape.
    #[error("unexpected response schema: {0}")]
    Schema(String),
}

impl FetchError {
    /// Returns true if another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Schema(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Connection("refused".into()).is_retryable());
        assert!(FetchError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(FetchError::Status(502).is_retryable());
        assert!(!FetchError::Schema("missing field `id`".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(FetchError::Timeout(Duration::from_secs(5)).to_string(), "timed out after 5000ms");
        assert_eq!(FetchError::Status(404).to_string(), "request failed with status: 404");
        assert!(FetchError::Connection("dns".into()).to_string().contains("dns"));
    }
}
