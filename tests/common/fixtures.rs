//! Provider doubles and item fixtures

use progressive_lookup::{Item, ProviderError, SearchOptions, SearchPayload, SearchProvider};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Provider that answers every lookup, optionally after a delay, and counts calls
#[derive(Default)]
pub struct CountingProvider {
    calls: AtomicU32,
    latency: Duration,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SearchProvider for CountingProvider {
    async fn search(
        &self,
        item_name: &str,
        options: &SearchOptions,
    ) -> Result<SearchPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(json!({
            "item": item_name,
            "related": options.include_related,
            "papers": [format!("{item_name} review")],
        }))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Provider that fails the first `failures` calls per item, then succeeds
pub struct FlakyProvider {
    failures: u32,
    attempts: Mutex<HashMap<String, u32>>,
}

impl FlakyProvider {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Provider that never succeeds
    pub fn always() -> Self {
        Self::new(u32::MAX)
    }

    pub fn attempts(&self, item_name: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(item_name)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl SearchProvider for FlakyProvider {
    async fn search(
        &self,
        item_name: &str,
        _options: &SearchOptions,
    ) -> Result<SearchPayload, ProviderError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(item_name.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if attempt <= self.failures {
            return Err(ProviderError::Unavailable(format!(
                "rate limited (attempt {attempt})"
            )));
        }
        Ok(json!({ "item": item_name, "attempt": attempt }))
    }
}

/// `n` items named `allergen-<i>` with priority `n - i` (already in priority order)
pub fn allergen_items(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| Item::new(format!("allergen-{i}")).with_priority((n - i) as i32))
        .collect()
}

pub fn allergen_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("allergen-{i}")).collect()
}
