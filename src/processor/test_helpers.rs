//! Shared test helpers: a scriptable mock provider and processor builders.

use crate::config::Config;
use crate::processor::Processor;
use crate::provider::{ProviderError, SearchOptions, SearchPayload, SearchProvider};
use crate::types::Item;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider whose behaviour is fixed at construction and which records every call
#[derive(Default)]
pub(crate) struct MockProvider {
    calls: AtomicU32,
    /// Every call for these items fails
    failing_items: Vec<String>,
    /// The first N calls per item fail, later ones succeed
    failures_before_success: u32,
    /// Simulated network time per call
    latency: Duration,
    per_item: Mutex<HashMap<String, u32>>,
    call_order: Mutex<Vec<String>>,
}

impl MockProvider {
    pub(crate) fn ok() -> Self {
        Self::default()
    }

    pub(crate) fn failing_for(items: &[&str]) -> Self {
        Self {
            failing_items: items.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn flaky(failures_before_success: u32) -> Self {
        Self {
            failures_before_success,
            ..Self::default()
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_for(&self, item: &str) -> u32 {
        self.per_item.lock().unwrap().get(item).copied().unwrap_or(0)
    }

    pub(crate) fn call_order(&self) -> Vec<String> {
        self.call_order.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchProvider for MockProvider {
    async fn search(
        &self,
        item_name: &str,
        options: &SearchOptions,
    ) -> Result<SearchPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_order.lock().unwrap().push(item_name.to_string());
        let attempt = {
            let mut per_item = self.per_item.lock().unwrap();
            let count = per_item.entry(item_name.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing_items.iter().any(|f| f == item_name) {
            return Err(ProviderError::Unavailable(format!("{item_name} is down")));
        }
        if attempt <= self.failures_before_success {
            return Err(ProviderError::Unavailable(format!(
                "attempt {attempt} for {item_name} refused"
            )));
        }

        Ok(json!({
            "item": item_name,
            "related": options.include_related,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Default config with a small batch size
pub(crate) fn test_config(batch_size: usize) -> Config {
    let mut config = Config::default();
    config.processor.batch_size = batch_size;
    config
}

pub(crate) fn create_test_processor(provider: Arc<MockProvider>, batch_size: usize) -> Processor {
    Processor::new(test_config(batch_size), provider).unwrap()
}

/// Items named after their position with the given priorities
pub(crate) fn items_with_priorities(priorities: &[i32]) -> Vec<Item> {
    priorities
        .iter()
        .enumerate()
        .map(|(i, p)| Item::new(format!("item-{i}")).with_priority(*p))
        .collect()
}

pub(crate) fn names(items: impl IntoIterator<Item = Item>) -> Vec<String> {
    items.into_iter().map(|i| i.name).collect()
}
