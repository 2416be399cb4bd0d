//! Progressive loading on top of the [`Processor`].
//!
//! Four ways to load a set of items:
//! - immediate: run everything now and return all results
//! - priority-first: run the top N now, background the rest
//! - on-demand: run exactly one item now
//! - background: run everything in a spawned task, observed via
//!   [`ProgressiveLoader::stream_progress`] or polled through
//!   [`ProgressiveLoader::partial_results`]
//!
//! Background job lifecycle lives in [`background`], snapshots in [`progress`].

mod background;
mod progress;


pub use progress::LoadingProgress;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::job::Job;
use crate::processor::{Processor, ensure_unique_names};
use crate::provider::SearchOptions;
use crate::types::{Item, JobId, ResultRecord, sort_by_priority};

use background::BackgroundJob;

/// Outcome of [`ProgressiveLoader::load_immediate`]
#[derive(Clone, Debug)]
pub struct ImmediateLoad {
    /// The fully processed job
    pub job: Arc<Job>,
    /// Every loaded result, in priority order
    pub results: Vec<ResultRecord>,
}

/// Outcome of [`ProgressiveLoader::load_priority_first`]
#[derive(Clone, Debug, Serialize)]
pub struct PriorityLoad {
    /// Results of the synchronously loaded top slice
    pub results: Vec<ResultRecord>,
    /// Job running the remainder, absent when nothing was left over
    pub background_job_id: Option<JobId>,
}

/// Strategy-aware loader managing background jobs
#[derive(Clone)]
pub struct ProgressiveLoader {
    processor: Processor,
    /// Background jobs by id (protected by Mutex)
    background: Arc<tokio::sync::Mutex<HashMap<JobId, BackgroundJob>>>,
}

impl std::fmt::Debug for ProgressiveLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressiveLoader")
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

impl ProgressiveLoader {
    /// Wrap a processor
    pub fn new(processor: Processor) -> Self {
        Self {
            processor,
            background: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        }
    }

    /// The underlying processor
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Process every item now and return all results
    ///
    /// Meant for small requests; the strategy selector enforces the bound.
    pub async fn load_immediate(
        &self,
        items: Vec<Item>,
        options: &SearchOptions,
    ) -> Result<ImmediateLoad> {
        let job = self.processor.create_job(items, true).await?;
        let job = self.processor.process_sync(job, options).await;
        let results = job.completed_results();
        Ok(ImmediateLoad { job, results })
    }

    /// Process the `priority_count` highest-priority items now, background the rest
    ///
    /// Validation covers the whole request before anything runs, so a duplicate
    /// in the background slice is still rejected up front.
    pub async fn load_priority_first(
        &self,
        mut items: Vec<Item>,
        priority_count: usize,
        options: &SearchOptions,
    ) -> Result<PriorityLoad> {
        ensure_unique_names(&items)?;
        sort_by_priority(&mut items);
        let rest = items.split_off(priority_count.min(items.len()));

        tracing::info!(
            immediate = items.len(),
            background = rest.len(),
            "Priority-first load"
        );

        let results = if items.is_empty() {
            Vec::new()
        } else {
            let job = self.processor.create_job(items, true).await?;
            self.processor.process_sync(job, options).await.completed_results()
        };

        let background_job_id = if rest.is_empty() {
            None
        } else {
            Some(self.start_background_job(rest, options).await?)
        };

        Ok(PriorityLoad {
            results,
            background_job_id,
        })
    }

    /// Load exactly one item now; `None` if its lookup failed
    pub async fn load_on_demand(
        &self,
        item: Item,
        options: &SearchOptions,
    ) -> Result<Option<ResultRecord>> {
        let job = self.processor.create_job(vec![item], false).await?;
        let job = self.processor.process_sync(job, options).await;
        Ok(job.completed_results().into_iter().next())
    }

    /// Look up a job, background or not
    pub(crate) async fn find_job(&self, job_id: JobId) -> Option<Arc<Job>> {
        if let Some(entry) = self.background.lock().await.get(&job_id) {
            return Some(Arc::clone(&entry.job));
        }
        self.processor.get_job(job_id).await
    }
}
