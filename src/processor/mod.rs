//! Batch processor split into focused submodules.
//!
//! The [`Processor`] owns the result cache and the provider handle, turns item
//! lists into [`Job`]s and runs them:
//! - [`execution`] - single-task algorithm (cache check, provider call, retries)
//! - [`batching`] - batch loop, pacing, progress callbacks, cancellation
//!
//! A `Processor` is cheap to clone (all fields are Arc-wrapped); clones share
//! the cache, the job registry and the event channel.

mod batching;
mod execution;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStats, ResultCache};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::job::Job;
use crate::provider::{SearchOptions, SearchProvider};
use crate::types::{Event, Item, JobId, JobSummary, ResultRecord, Task, TaskId, sort_by_priority};

/// Observer invoked with the job after every completed batch, in batch order
pub type ProgressCallback = Arc<dyn Fn(&Job) + Send + Sync>;

/// How tasks inside one batch are executed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One task after another
    Sequential,
    /// All tasks of the batch at once (bounded by batch size)
    Concurrent,
}

/// Turns items into jobs and executes them against the provider
#[derive(Clone)]
pub struct Processor {
    /// Result cache shared by every job this processor runs
    pub(crate) cache: Arc<ResultCache>,
    /// External lookup service
    pub(crate) provider: Arc<dyn SearchProvider>,
    /// Configuration (validated at construction)
    pub(crate) config: Arc<Config>,
    /// Jobs created by this processor, by id; held weakly so a job leaves
    /// the registry once every holder has dropped it
    jobs: Arc<RwLock<HashMap<JobId, Weak<Job>>>>,
    next_job_id: Arc<AtomicU64>,
    next_task_id: Arc<AtomicU64>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Callback registered for every run of this processor
    on_batch: Option<ProgressCallback>,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .field("has_progress_callback", &self.on_batch.is_some())
            .finish_non_exhaustive()
    }
}

impl Processor {
    /// Create a processor with its own, empty cache
    pub fn new(config: Config, provider: Arc<dyn SearchProvider>) -> Result<Self> {
        let cache = Arc::new(ResultCache::new(config.cache.ttl()));
        Self::with_cache(config, provider, cache)
    }

    /// Create a processor around an existing cache (e.g. shared between processors)
    pub fn with_cache(
        config: Config,
        provider: Arc<dyn SearchProvider>,
        cache: Arc<ResultCache>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        tracing::debug!(
            provider = provider.name(),
            batch_size = config.processor.batch_size,
            max_retries = config.retry.max_retries,
            "Processor created"
        );

        Ok(Self {
            cache,
            provider,
            config: Arc::new(config),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            next_job_id: Arc::new(AtomicU64::new(1)),
            next_task_id: Arc::new(AtomicU64::new(1)),
            event_tx,
            on_batch: None,
        })
    }

    /// Register a callback invoked after every batch of every run
    pub fn with_progress_callback(
        mut self,
        callback: impl Fn(&Job) + Send + Sync + 'static,
    ) -> Self {
        self.on_batch = Some(Arc::new(callback));
        self
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The result cache
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Cache occupancy
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Subscribe to job events
    ///
    /// Events sent before subscribing are not replayed. A receiver that falls
    /// more than 1000 events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Build a job from `items` without starting it
    ///
    /// With `sort` the tasks are ordered by priority, then weight,
    /// descending; equal items keep their input order. Item names must be unique
    /// (case-insensitive).
    pub async fn create_job(&self, mut items: Vec<Item>, sort: bool) -> Result<Arc<Job>> {
        ensure_unique_names(&items)?;

        if sort {
            sort_by_priority(&mut items);
        }

        let job_id = JobId(self.next_job_id.fetch_add(1, Ordering::Relaxed));
        let tasks = items
            .into_iter()
            .map(|item| {
                let task_id = TaskId(self.next_task_id.fetch_add(1, Ordering::Relaxed));
                Task::new(task_id, item)
            })
            .collect();
        let job = Arc::new(Job::new(job_id, tasks));

        {
            let mut jobs = self.jobs.write().await;
            jobs.retain(|_, held| held.strong_count() > 0);
            jobs.insert(job_id, Arc::downgrade(&job));
        }

        tracing::info!(job_id = %job_id, total = job.len(), "Job created");
        self.emit_event(Event::JobCreated {
            job_id,
            total: job.len(),
        });

        Ok(job)
    }

    /// Run every task of `job`, one task at a time within each batch
    pub async fn process_sync(&self, job: Arc<Job>, options: &SearchOptions) -> Arc<Job> {
        self.run_batches(&job, options, ExecutionMode::Sequential, None, None)
            .await;
        job
    }

    /// Run every task of `job`, all tasks of a batch concurrently
    pub async fn process_concurrent(&self, job: Arc<Job>, options: &SearchOptions) -> Arc<Job> {
        self.run_batches(&job, options, ExecutionMode::Concurrent, None, None)
            .await;
        job
    }

    /// Run `job` until it completes or `cancel` fires
    ///
    /// Cancellation is checked before each task and during inter-batch pacing.
    /// Tasks already executing finish (including their retries); tasks not yet
    /// dispatched stay Pending and the job is flagged cancelled.
    pub async fn process_cancellable(
        &self,
        job: Arc<Job>,
        options: &SearchOptions,
        mode: ExecutionMode,
        cancel: &CancellationToken,
    ) -> Arc<Job> {
        self.run_batches(&job, options, mode, None, Some(cancel))
            .await;
        job
    }

    /// Loaded results of `job` so far (Completed and Cached tasks only)
    pub fn get_completed_results(&self, job: &Job) -> Vec<ResultRecord> {
        job.completed_results()
    }

    /// Look up a job created by this processor that is still held somewhere
    pub async fn get_job(&self, job_id: JobId) -> Option<Arc<Job>> {
        self.jobs.read().await.get(&job_id).and_then(Weak::upgrade)
    }

    /// Per-status counts of a job
    pub async fn job_status_summary(&self, job_id: JobId) -> Result<JobSummary> {
        self.get_job(job_id)
            .await
            .map(|job| job.summary())
            .ok_or(Error::JobNotFound(job_id))
    }

    /// Forget a job; holders of its `Arc` keep a working handle
    pub async fn remove_job(&self, job_id: JobId) -> Option<Arc<Job>> {
        let removed = self
            .jobs
            .write()
            .await
            .remove(&job_id)
            .and_then(|held| held.upgrade());
        if removed.is_some() {
            tracing::debug!(job_id = %job_id, "Job removed from registry");
        }
        removed
    }

    /// Number of registered jobs that are still alive
    pub async fn job_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|held| held.strong_count() > 0)
            .count()
    }
}

/// Reject item lists in which two names are equal ignoring case and surrounding whitespace
pub(crate) fn ensure_unique_names(items: &[Item]) -> Result<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.name.trim().to_lowercase()) {
            return Err(Error::DuplicateItem(item.name.clone()));
        }
    }
    Ok(())
}
