//! Retry wait schedule with exponential backoff
//!
//! The task loop in [`crate::processor`] owns the retry decision (it has to
//! update task state and re-check the cache between attempts); this module only
//! answers "how long do we wait before retry number N".
//!
//! With the default [`RetryConfig`] (`backoff_multiplier = 1.0`, no jitter) every
//! wait equals `retry_delay`, i.e. a fixed pause between attempts.

use crate::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Wait before retry number `retry` (1-based)
///
/// `retry_delay * backoff_multiplier^(retry - 1)`, capped at `max_delay`,
/// then jittered when enabled. `retry = 0` is treated as the first retry.
pub fn retry_delay(config: &RetryConfig, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
    let base = config.retry_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    let capped = Duration::try_from_secs_f64(base)
        .unwrap_or(config.max_delay)
        .min(config.max_delay);

    if config.jitter {
        add_jitter(capped)
    } else {
        capped
    }
}

/// Whether a task that has already retried `retry_count` times may retry again
pub fn should_retry(config: &RetryConfig, retry_count: u32) -> bool {
    retry_count < config.max_retries
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    delay.mul_f64(1.0 + jitter_factor)
}
