//! Background jobs: spawn, observe, cancel, forget.
//!
//! Each background job runs the sequential batch loop in its own tokio task with
//! a dedicated callback that pushes a [`LoadingProgress`] snapshot onto an
//! unbounded channel after every batch. When the run ends (finished or
//! cancelled) one final snapshot and the `Done` sentinel follow, then the sender
//! is dropped.
//!
//! The channel buffers until its single consumer takes it, so the first
//! `stream_progress` call sees every snapshot even if it subscribes late. The
//! stream is not restartable: later calls get `ProgressUnavailable`.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::ProgressiveLoader;
use super::progress::{LoadingProgress, ProgressUpdate};
use crate::error::{Error, Result};
use crate::job::Job;
use crate::processor::{ExecutionMode, ProgressCallback};
use crate::provider::SearchOptions;
use crate::types::{Item, JobId, ResultRecord};

/// Registry entry for one background job
pub(super) struct BackgroundJob {
    pub(super) job: Arc<Job>,
    /// Taken by the first `stream_progress` call
    progress_rx: Option<mpsc::UnboundedReceiver<ProgressUpdate>>,
    cancel: CancellationToken,
    /// Tripped once the spawned run has ended (finished, cancelled or panicked)
    finished: CancellationToken,
}

impl ProgressiveLoader {
    /// Create a job from `items` and run it in a spawned task; returns its id at once
    pub async fn start_background_job(
        &self,
        items: Vec<Item>,
        options: &SearchOptions,
    ) -> Result<JobId> {
        let job = self.processor.create_job(items, true).await?;
        let job_id = job.id();

        let (tx, rx) = mpsc::unbounded_channel();
        let average = self.processor.config().loader.average_task_duration;

        let callback: ProgressCallback = {
            let tx = tx.clone();
            Arc::new(move |job: &Job| {
                tx.send(ProgressUpdate::Snapshot(LoadingProgress::from_job(job, average)))
                    .ok();
            })
        };

        let cancel = CancellationToken::new();
        let processor = self.processor.clone();
        let run_job = Arc::clone(&job);
        let token = cancel.clone();
        let finished = CancellationToken::new();
        let done = finished.clone();
        let options = options.clone();

        // Hold the registry lock across the spawn so the entry exists before the task can finish
        let mut background = self.background.lock().await;
        tokio::spawn(async move {
            let _done = done.drop_guard();
            processor
                .run_batches(
                    &run_job,
                    &options,
                    ExecutionMode::Sequential,
                    Some(&callback),
                    Some(&token),
                )
                .await;

            tx.send(ProgressUpdate::Snapshot(LoadingProgress::from_job(&run_job, average)))
                .ok();
            tx.send(ProgressUpdate::Done).ok();

            tracing::info!(
                job_id = %run_job.id(),
                loaded = run_job.loaded_count(),
                failed = run_job.failed_count(),
                cancelled = run_job.is_cancelled(),
                "Background job ended"
            );
        });

        background.insert(
            job_id,
            BackgroundJob {
                job,
                progress_rx: Some(rx),
                cancel,
                finished,
            },
        );

        tracing::info!(job_id = %job_id, "Background job started");
        Ok(job_id)
    }

    /// Progress snapshots of a background job, ending after the final one
    ///
    /// Only one stream per job can exist; a second call fails with
    /// [`Error::ProgressUnavailable`].
    pub async fn stream_progress(
        &self,
        job_id: JobId,
    ) -> Result<impl Stream<Item = LoadingProgress> + Send + 'static> {
        let rx = {
            let mut background = self.background.lock().await;
            let entry = background
                .get_mut(&job_id)
                .ok_or(Error::JobNotFound(job_id))?;
            entry
                .progress_rx
                .take()
                .ok_or(Error::ProgressUnavailable(job_id))?
        };

        Ok(futures::stream::unfold(rx, |mut rx| async move {
            match rx.recv().await {
                Some(ProgressUpdate::Snapshot(progress)) => Some((progress, rx)),
                Some(ProgressUpdate::Done) | None => None,
            }
        }))
    }

    /// Current progress of any known job (pollable alternative to the stream)
    pub async fn progress(&self, job_id: JobId) -> Result<LoadingProgress> {
        let job = self
            .find_job(job_id)
            .await
            .ok_or(Error::JobNotFound(job_id))?;
        Ok(LoadingProgress::from_job(
            &job,
            self.processor.config().loader.average_task_duration,
        ))
    }

    /// Whatever results a job has so far; safe while it runs
    pub async fn partial_results(&self, job_id: JobId) -> Result<Vec<ResultRecord>> {
        self.find_job(job_id)
            .await
            .map(|job| job.completed_results())
            .ok_or(Error::JobNotFound(job_id))
    }

    /// All results of a job, or [`Error::NotReady`] while any task is not terminal
    pub async fn background_results(&self, job_id: JobId) -> Result<Vec<ResultRecord>> {
        let job = self
            .find_job(job_id)
            .await
            .ok_or(Error::JobNotFound(job_id))?;
        if !job.is_complete() {
            return Err(Error::NotReady(job_id));
        }
        Ok(job.completed_results())
    }

    /// Ask a background job to stop; tasks already running finish first
    pub async fn cancel_background_job(&self, job_id: JobId) -> Result<()> {
        let background = self.background.lock().await;
        let entry = background.get(&job_id).ok_or(Error::JobNotFound(job_id))?;
        entry.cancel.cancel();
        tracing::info!(job_id = %job_id, "Background job cancellation requested");
        Ok(())
    }

    /// Wait until a background job's task has ended (finished or cancelled)
    ///
    /// Any number of callers may wait on the same job; all of them return once
    /// the run is over.
    pub async fn wait_background_job(&self, job_id: JobId) -> Result<Arc<Job>> {
        let (job, finished) = {
            let background = self.background.lock().await;
            let entry = background.get(&job_id).ok_or(Error::JobNotFound(job_id))?;
            (Arc::clone(&entry.job), entry.finished.clone())
        };

        finished.cancelled().await;
        Ok(job)
    }

    /// Drop a background job from both registries
    ///
    /// A job still running is cancelled. Holders of the job's `Arc` keep a
    /// working handle.
    pub async fn forget_background_job(&self, job_id: JobId) -> Result<Arc<Job>> {
        let entry = self
            .background
            .lock()
            .await
            .remove(&job_id)
            .ok_or(Error::JobNotFound(job_id))?;

        if !entry.job.is_complete() {
            entry.cancel.cancel();
        }
        self.processor.remove_job(job_id).await;
        tracing::debug!(job_id = %job_id, "Background job forgotten");
        Ok(entry.job)
    }

    /// Ids of background jobs still registered
    pub async fn background_job_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.background.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }
}
