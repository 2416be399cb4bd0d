//! Provider boundary: the slow external lookup service behind every cache miss.
//!
//! The processor only knows the [`SearchProvider`] trait; concrete literature
//! search clients live outside this crate. Any [`ProviderError`] (timeouts
//! included) is handled the same way: it counts toward the task's retry budget.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Opaque result returned by a provider and stored in the cache as-is.
pub type SearchPayload = serde_json::Value;

/// Errors a provider call can produce
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The call did not finish within the configured timeout
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    /// Provider is down, rate limiting, or refusing connections
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Provider answered with something that could not be interpreted
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// Options passed through to the provider for every task of a run.
///
/// Only the result-affecting fields take part in the cache key
/// (see [`SearchOptions::signature`]); `timeout` does not.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Also search for related items (e.g. cross-reactive allergens)
    #[serde(default)]
    pub include_related: bool,

    /// Cap on the number of hits the provider should return (None = provider default)
    #[serde(default)]
    pub max_results: Option<u32>,

    /// Per-call timeout; falls back to `ProcessorConfig::provider_timeout` when unset
    #[serde(default, with = "crate::config::optional_duration_secs")]
    pub timeout: Option<Duration>,
}

impl SearchOptions {
    /// Options with related-item expansion switched on
    pub fn with_related() -> Self {
        Self {
            include_related: true,
            ..Self::default()
        }
    }

    /// Canonical string form of the result-affecting options
    pub fn signature(&self) -> String {
        let max = self
            .max_results
            .map_or_else(|| "default".to_string(), |n| n.to_string());
        format!(
            "related={};max={}",
            if self.include_related { "yes" } else { "no" },
            max
        )
    }
}

/// Abstraction over the external lookup service, enabling testability.
///
/// Implementations must be safe to call concurrently from multiple tasks.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one lookup for `item_name`
    async fn search(
        &self,
        item_name: &str,
        options: &SearchOptions,
    ) -> std::result::Result<SearchPayload, ProviderError>;

    /// Short name used in log lines
    fn name(&self) -> &str {
        "provider"
    }
}
