//! Error types surfaced by fetch capabilities and by the aggregator.

use thiserror::Error;

/// Failure raised by a fetch capability.
///
/// For the primary fetch this is fatal and reaches the caller unchanged.
/// For dependent fetches it is absorbed into an empty fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The data source could not be reached.
    #[error("cannot connect to {url}")]
    Connect { url: String },

    /// The data source did not answer in time.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The data source answered with a non-success status.
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The requested record does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Any other failure reported by the source.
    #[error("{source_name} unavailable: {message}")]
    Unavailable {
        source_name: String,
        message: String,
    },

    /// The fetch observed its cancellation context and stopped early.
    #[error("fetch interrupted by cancellation")]
    Interrupted,
}

impl FetchError {
    pub fn unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Failure of a whole aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The primary fetch failed.
    #[error("failed to load user details: {0}")]
    Fetch(#[from] FetchError),

    /// The aggregation's cancellation context was cancelled.
    #[error("aggregation cancelled")]
    Cancelled,
}

impl AggregateError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_messages() {
        let err = FetchError::Status {
            url: "http://localhost/user".to_string(),
            status: 503,
            body: "down".to_string(),
        };
        assert_eq!(err.to_string(), "http://localhost/user returned status 503: down");
        assert_eq!(
            FetchError::unavailable("comments", "boom").to_string(),
            "comments unavailable: boom"
        );
    }

    #[test]
    fn test_aggregate_error_wraps_fetch_error() {
        let err: AggregateError = FetchError::Interrupted.into();
        assert_eq!(err, AggregateError::Fetch(FetchError::Interrupted));
        assert!(!err.is_cancelled());
        assert!(AggregateError::Cancelled.is_cancelled());
    }
}
