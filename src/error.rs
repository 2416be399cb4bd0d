//! Error types for progressive-lookup
//!
//! Per-task provider failures never surface through this type: they are recorded
//! on the task itself (see [`TaskStatus::Failed`](crate::types::TaskStatus::Failed)).
//! The variants here cover caller mistakes (bad config, unknown job ids, duplicate
//! items) and lookups that are not ready yet.

use crate::provider::ProviderError;
use crate::types::JobId;
use thiserror::Error;

/// Result type alias for progressive-lookup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for progressive-lookup
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "processor.batch_size")
        key: Option<String>,
    },

    /// No job with this id is known to the processor or loader
    #[error("job {0} not found")]
    JobNotFound(JobId),

    /// Job exists but has not reached a terminal state yet
    #[error("job {0} is not complete yet")]
    NotReady(JobId),

    /// The progress stream for this job was already taken or never existed
    #[error("progress stream for job {0} is unavailable")]
    ProgressUnavailable(JobId),

    /// Two items in one job share a name (compared case-insensitively)
    #[error("duplicate item in job: {0}")]
    DuplicateItem(String),

    /// Provider error, for hosts that call a `SearchProvider` directly and want
    /// one error type; task failures are recorded on the task instead
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a config error tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Convert errors to HTTP status codes for the API layer embedding this crate
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::DuplicateItem(_) => 400,
            Error::JobNotFound(_) => 404,
            // Caller should poll again later
            Error::NotReady(_) => 409,
            // Stream was consumed by an earlier subscriber
            Error::ProgressUnavailable(_) => 410,
            Error::Provider(_) => 502,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::DuplicateItem(_) => "duplicate_item",
            Error::JobNotFound(_) => "job_not_found",
            Error::NotReady(_) => "not_ready",
            Error::ProgressUnavailable(_) => "progress_unavailable",
            Error::Provider(ProviderError::Timeout(_)) => "provider_timeout",
            Error::Provider(_) => "provider_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// (Error, expected status, expected code) for every match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("processor.batch_size".into()),
                },
                400,
                "config_error",
            ),
            (Error::DuplicateItem("peanut".into()), 400, "duplicate_item"),
            (Error::JobNotFound(JobId(7)), 404, "job_not_found"),
            (Error::NotReady(JobId(7)), 409, "not_ready"),
            (
                Error::ProgressUnavailable(JobId(7)),
                410,
                "progress_unavailable",
            ),
            (
                Error::Provider(ProviderError::Timeout(Duration::from_secs(3))),
                502,
                "provider_timeout",
            ),
            (
                Error::Provider(ProviderError::Unavailable("503".into())),
                502,
                "provider_error",
            ),
            (Error::Other("boom".into()), 500, "internal_error"),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_and_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            assert_eq!(
                error.status_code(),
                expected_status,
                "{error} should map to HTTP {expected_status}"
            );
            assert_eq!(
                error.error_code(),
                expected_code,
                "{error} should map to code {expected_code}"
            );
        }
    }

    #[test]
    fn config_helper_records_key() {
        let err = Error::config("cache.ttl_hours", "must be finite");
        match err {
            Error::Config { message, key } => {
                assert_eq!(message, "must be finite");
                assert_eq!(key.as_deref(), Some("cache.ttl_hours"));
            }
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn provider_error_converts_via_from() {
        let err: Error = ProviderError::Other("bad gateway".into()).into();
        assert!(matches!(err, Error::Provider(ProviderError::Other(_))));
        assert!(err.to_string().contains("bad gateway"));
    }
}
