//! Smart loader: picks a strategy from the request size and returns one
//! uniform result envelope whatever strategy ran.
//!
//! Items are built from raw names plus an optional weight map; priorities come
//! from a [`PriorityTable`] (`priority = base + weight * 5`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::StrategyThresholds;
use crate::error::Result;
use crate::loader::ProgressiveLoader;
use crate::provider::SearchOptions;
use crate::strategy::LoadingStrategy;
use crate::types::{Item, JobId, ResultRecord, sort_by_priority};

/// Static base priorities by item name (case-insensitive)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriorityTable {
    /// Base priority of items missing from `entries`
    #[serde(default = "default_base_priority")]
    pub default_priority: i32,
    /// Lower-cased item name to base priority
    #[serde(default)]
    entries: HashMap<String, i32>,
}

fn default_base_priority() -> i32 {
    50
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new(default_base_priority())
    }
}

impl PriorityTable {
    /// Empty table with the given fallback priority
    pub fn new(default_priority: i32) -> Self {
        Self {
            default_priority,
            entries: HashMap::new(),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: &str, base_priority: i32) -> Self {
        self.insert(name, base_priority);
        self
    }

    /// Set the base priority of `name`
    pub fn insert(&mut self, name: &str, base_priority: i32) {
        self.entries.insert(name.trim().to_lowercase(), base_priority);
    }

    /// Base priority of `name`, or the default
    pub fn base_priority(&self, name: &str) -> i32 {
        self.entries
            .get(&name.trim().to_lowercase())
            .copied()
            .unwrap_or(self.default_priority)
    }

    /// Build an item with its priority derived from the table and `weight`
    pub fn item(&self, name: impl Into<String>, weight: u8) -> Item {
        let name = name.into();
        let base = self.base_priority(&name);
        Item::weighted(name, weight, base)
    }
}

/// Uniform envelope returned by [`SmartLoader::load`]
#[derive(Clone, Debug, Serialize)]
pub struct SmartLoadResult {
    /// Strategy that actually ran
    pub strategy_used: LoadingStrategy,
    /// Results available now
    pub immediate_results: Vec<ResultRecord>,
    /// Job still loading the rest, if any
    pub background_job_id: Option<JobId>,
    /// Number of requested items
    pub total_items: usize,
    /// Number of results in `immediate_results`
    pub loaded_count: usize,
}

/// Strategy-selecting façade over a [`ProgressiveLoader`]
#[derive(Clone, Debug)]
pub struct SmartLoader {
    loader: ProgressiveLoader,
    priorities: PriorityTable,
    thresholds: StrategyThresholds,
}

impl SmartLoader {
    /// Façade using the processor's configured thresholds and an empty priority table
    pub fn new(loader: ProgressiveLoader) -> Self {
        let thresholds = loader.processor().config().strategy.clone();
        Self {
            loader,
            priorities: PriorityTable::default(),
            thresholds,
        }
    }

    /// Replace the priority table
    pub fn with_priority_table(mut self, priorities: PriorityTable) -> Self {
        self.priorities = priorities;
        self
    }

    /// The wrapped loader (for streaming/polling background jobs)
    pub fn loader(&self) -> &ProgressiveLoader {
        &self.loader
    }

    fn weight_of(weights: &HashMap<String, u8>, name: &str) -> u8 {
        weights
            .get(name)
            .or_else(|| {
                weights
                    .iter()
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case(name.trim()))
                    .map(|(_, weight)| weight)
            })
            .copied()
            .unwrap_or(0)
    }

    /// Load `item_names`, choosing the strategy from their count unless `forced`
    ///
    /// A forced [`LoadingStrategy::OnDemand`] loads only the highest-priority item.
    pub async fn load<I, S>(
        &self,
        item_names: I,
        weights: &HashMap<String, u8>,
        options: &SearchOptions,
        forced: Option<LoadingStrategy>,
    ) -> Result<SmartLoadResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<Item> = item_names
            .into_iter()
            .map(|name| {
                let name = name.into();
                let weight = Self::weight_of(weights, &name);
                self.priorities.item(name, weight)
            })
            .collect();
        let total_items = items.len();
        let strategy = forced.unwrap_or_else(|| self.thresholds.select(total_items));

        tracing::info!(
            total_items,
            strategy = %strategy,
            forced = forced.is_some(),
            "Smart load"
        );

        let (immediate_results, background_job_id) = match strategy {
            LoadingStrategy::Immediate => {
                let load = self.loader.load_immediate(items, options).await?;
                (load.results, None)
            }
            LoadingStrategy::PriorityFirst => {
                let count = self.loader.processor().config().loader.priority_first_count;
                let load = self.loader.load_priority_first(items, count, options).await?;
                (load.results, load.background_job_id)
            }
            LoadingStrategy::Background => {
                let count = self.thresholds.background_immediate_count;
                let load = self.loader.load_priority_first(items, count, options).await?;
                (load.results, load.background_job_id)
            }
            LoadingStrategy::OnDemand => {
                let mut items = items;
                sort_by_priority(&mut items);
                match items.into_iter().next() {
                    Some(top) => {
                        let result = self.loader.load_on_demand(top, options).await?;
                        (result.into_iter().collect(), None)
                    }
                    None => (Vec::new(), None),
                }
            }
        };

        Ok(SmartLoadResult {
            strategy_used: strategy,
            loaded_count: immediate_results.len(),
            immediate_results,
            background_job_id,
            total_items,
        })
    }
}
