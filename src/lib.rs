//! # progressive-lookup
//!
//! Priority-aware, incrementally loading batch lookup scheduler with a TTL
//! result cache.
//!
//! Fans out a set of independent lookups against a slow external provider,
//! returns the most important results first and keeps loading the rest in the
//! background.
//!
//! ## Design Philosophy
//!
//! progressive-lookup is designed to be:
//! - **Library-first** - No CLI or server, purely a Rust crate for embedding
//! - **Sensible defaults** - `Config::default()` works out of the box
//! - **Injected dependencies** - The provider and cache are handed in, so several
//!   independent processors can coexist (and tests stay isolated)
//! - **Observable** - Per-batch callbacks, progress streams and broadcast events
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use progressive_lookup::{
//!     Config, ProgressiveLoader, Processor, ProviderError, SearchOptions, SearchPayload,
//!     SearchProvider, SmartLoader,
//! };
//!
//! struct Literature;
//!
//! #[async_trait::async_trait]
//! impl SearchProvider for Literature {
//!     async fn search(
//!         &self,
//!         item_name: &str,
//!         _options: &SearchOptions,
//!     ) -> Result<SearchPayload, ProviderError> {
//!         Ok(serde_json::json!({ "item": item_name, "papers": [] }))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = Processor::new(Config::default(), Arc::new(Literature))?;
//!     let smart = SmartLoader::new(ProgressiveLoader::new(processor));
//!
//!     let names: Vec<String> = (0..12).map(|i| format!("item-{i}")).collect();
//!     let result = smart
//!         .load(names, &HashMap::new(), &SearchOptions::default(), None)
//!         .await?;
//!     println!("{} results now", result.loaded_count);
//!
//!     if let Some(job_id) = result.background_job_id {
//!         let mut progress = Box::pin(smart.loader().stream_progress(job_id).await?);
//!         while let Some(snapshot) = progress.next().await {
//!             println!("{}/{} loaded", snapshot.loaded, snapshot.total);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// TTL result cache
pub mod cache;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Job: ordered collection of tasks
pub mod job;
/// Progressive loading strategies and background jobs
pub mod loader;
/// Batch processor (decomposed into focused submodules)
pub mod processor;
/// Provider boundary
pub mod provider;
/// Retry wait schedule with exponential backoff
pub mod retry;
/// Strategy-selecting façade
pub mod smart;
/// Loading strategy selection
pub mod strategy;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use cache::{CacheStats, ResultCache};
pub use config::{
    CacheConfig, Config, LoaderConfig, ProcessorConfig, RetryConfig, StrategyThresholds,
};
pub use error::{Error, Result, ToHttpStatus};
pub use job::Job;
pub use loader::{ImmediateLoad, LoadingProgress, PriorityLoad, ProgressiveLoader};
pub use processor::{ExecutionMode, ProgressCallback, Processor};
pub use provider::{ProviderError, SearchOptions, SearchPayload, SearchProvider};
pub use smart::{PriorityTable, SmartLoadResult, SmartLoader};
pub use strategy::{LoadingStrategy, select_strategy};
pub use types::{Event, Item, JobId, JobSummary, ResultRecord, Task, TaskId, TaskStatus};
