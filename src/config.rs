//! Configuration types for progressive-lookup
//!
//! Every field has a serde default, so `{}` deserializes to [`Config::default`].
//! Durations are written as (fractional) seconds.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batch execution settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Tasks per batch; also the concurrency bound of concurrent runs (default: 5)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between two batches to respect provider rate limits (default: 2 seconds)
    #[serde(default = "default_inter_batch_delay", with = "duration_secs")]
    pub inter_batch_delay: Duration,

    /// Timeout for one provider call when the options do not set one (default: 30 seconds)
    #[serde(default = "default_provider_timeout", with = "duration_secs")]
    pub provider_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_batch_delay: default_inter_batch_delay(),
            provider_timeout: default_provider_timeout(),
        }
    }
}

/// Retry configuration for failed provider calls
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt; a task gets `max_retries + 1` attempts (default: 2)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wait before the first retry (default: 1 second)
    #[serde(default = "default_retry_delay", with = "duration_secs")]
    pub retry_delay: Duration,

    /// Multiplier applied per further retry (default: 1.0 = fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for a single retry wait (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_secs")]
    pub max_delay: Duration,

    /// Add random jitter to retry waits (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay: default_max_delay(),
            jitter: false,
        }
    }
}

/// Result cache configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in hours (default: 24)
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: f64,
}

impl CacheConfig {
    /// TTL as a Duration
    pub fn ttl(&self) -> Duration {
        Duration::try_from_secs_f64(self.ttl_hours.max(0.0) * 3600.0).unwrap_or(Duration::MAX)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
        }
    }
}

/// Progressive loading settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Per-task duration estimate used for remaining-time estimates (default: 2 seconds)
    #[serde(default = "default_average_task_duration", with = "duration_secs")]
    pub average_task_duration: Duration,

    /// Items loaded synchronously by the priority-first strategy (default: 5)
    #[serde(default = "default_priority_first_count")]
    pub priority_first_count: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            average_task_duration: default_average_task_duration(),
            priority_first_count: default_priority_first_count(),
        }
    }
}

/// Item-count thresholds used to pick a loading strategy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyThresholds {
    /// Up to this many items are loaded immediately (default: 5)
    #[serde(default = "default_immediate_max")]
    pub immediate_max: usize,

    /// Up to this many items use priority-first; more go to background (default: 20)
    #[serde(default = "default_priority_first_max")]
    pub priority_first_max: usize,

    /// Items loaded synchronously before backgrounding a large request (default: 3)
    #[serde(default = "default_background_immediate_count")]
    pub background_immediate_count: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            immediate_max: default_immediate_max(),
            priority_first_max: default_priority_first_max(),
            background_immediate_count: default_background_immediate_count(),
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Batch execution
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Retry behaviour for failed provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Result cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Progressive loading
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Strategy selection thresholds
    #[serde(default)]
    pub strategy: StrategyThresholds,
}

impl Config {
    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.processor.batch_size == 0 {
            return Err(Error::config(
                "processor.batch_size",
                "batch size must be at least 1",
            ));
        }
        if !self.cache.ttl_hours.is_finite() || self.cache.ttl_hours < 0.0 {
            return Err(Error::config(
                "cache.ttl_hours",
                format!(
                    "ttl must be a finite, non-negative number of hours, got {}",
                    self.cache.ttl_hours
                ),
            ));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                format!(
                    "backoff multiplier must be >= 1.0, got {}",
                    self.retry.backoff_multiplier
                ),
            ));
        }
        if self.strategy.immediate_max >= self.strategy.priority_first_max {
            return Err(Error::config(
                "strategy.immediate_max",
                format!(
                    "immediate_max ({}) must be below priority_first_max ({})",
                    self.strategy.immediate_max, self.strategy.priority_first_max
                ),
            ));
        }
        if self.strategy.background_immediate_count == 0 {
            return Err(Error::config(
                "strategy.background_immediate_count",
                "background requests must load at least one item immediately",
            ));
        }
        Ok(())
    }
}

fn default_batch_size() -> usize {
    5
}

fn default_inter_batch_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_provider_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_ttl_hours() -> f64 {
    24.0
}

fn default_average_task_duration() -> Duration {
    Duration::from_secs(2)
}

fn default_priority_first_count() -> usize {
    5
}

fn default_immediate_max() -> usize {
    5
}

fn default_priority_first_max() -> usize {
    20
}

fn default_background_immediate_count() -> usize {
    3
}

// Duration as fractional seconds
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

// Optional Duration as fractional seconds
pub(crate) mod optional_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        secs.map(|s| Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
