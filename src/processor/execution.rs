//! Single-task execution: cache lookup, bounded provider call, retries.

use super::Processor;
use crate::job::Job;
use crate::provider::{ProviderError, SearchOptions, SearchPayload};
use crate::retry;
use crate::types::{Event, TaskStatus};

impl Processor {
    /// Drive the task at `index` of `job` to a terminal state
    ///
    /// Only Pending tasks are dispatched; anything else returns `None` untouched.
    ///
    /// The cache is consulted before every attempt, so a result stored by a
    /// concurrent task for the same key between two attempts is picked up.
    /// Provider failures (timeouts included) consume the retry budget; once it is
    /// spent the task is Failed. Nothing here returns an error to the caller.
    pub(crate) async fn execute_task(
        &self,
        job: &Job,
        index: usize,
        options: &SearchOptions,
    ) -> Option<TaskStatus> {
        let (task_id, item) = job
            .update_task(index, |task| {
                if task.status != TaskStatus::Pending {
                    return None;
                }
                task.mark_in_progress();
                Some((task.task_id, task.item.clone()))
            })
            .flatten()?;
        let job_id = job.id();

        tracing::debug!(job_id = %job_id, task_id = %task_id, item = %item.name, "Task started");

        loop {
            if let Some(payload) = self.cache.get(&item.name, options) {
                job.update_task(index, |task| task.mark_cached(payload));
                tracing::debug!(
                    job_id = %job_id,
                    task_id = %task_id,
                    item = %item.name,
                    "Task served from cache"
                );
                self.emit_event(Event::TaskCompleted {
                    job_id,
                    task_id,
                    item: item.name.clone(),
                    cached: true,
                });
                return Some(TaskStatus::Cached);
            }

            match self.call_provider(&item.name, options).await {
                Ok(payload) => {
                    self.cache.set(&item.name, options, payload.clone());
                    job.update_task(index, |task| task.mark_completed(payload));
                    tracing::debug!(
                        job_id = %job_id,
                        task_id = %task_id,
                        item = %item.name,
                        "Task completed"
                    );
                    self.emit_event(Event::TaskCompleted {
                        job_id,
                        task_id,
                        item: item.name.clone(),
                        cached: false,
                    });
                    return Some(TaskStatus::Completed);
                }
                Err(e) => {
                    let retry_count = job.update_task(index, |task| {
                        let can_retry = retry::should_retry(&self.config.retry, task.retry_count);
                        if can_retry {
                            task.retry_count += 1;
                            Some(task.retry_count)
                        } else {
                            task.mark_failed(e.to_string());
                            None
                        }
                    })?;

                    let Some(retry) = retry_count else {
                        tracing::error!(
                            job_id = %job_id,
                            task_id = %task_id,
                            item = %item.name,
                            error = %e,
                            attempts = self.config.retry.max_retries + 1,
                            "Task failed after all retry attempts exhausted"
                        );
                        self.emit_event(Event::TaskFailed {
                            job_id,
                            task_id,
                            item: item.name.clone(),
                            error: e.to_string(),
                        });
                        return Some(TaskStatus::Failed);
                    };

                    let delay = retry::retry_delay(&self.config.retry, retry);
                    tracing::warn!(
                        job_id = %job_id,
                        task_id = %task_id,
                        item = %item.name,
                        error = %e,
                        retry,
                        max_retries = self.config.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Provider call failed, retrying"
                    );
                    self.emit_event(Event::TaskRetrying {
                        job_id,
                        task_id,
                        item: item.name.clone(),
                        retry,
                        error: e.to_string(),
                    });

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One provider call bounded by the effective timeout
    async fn call_provider(
        &self,
        item_name: &str,
        options: &SearchOptions,
    ) -> Result<SearchPayload, ProviderError> {
        let timeout = options
            .timeout
            .unwrap_or(self.config.processor.provider_timeout);

        match tokio::time::timeout(timeout, self.provider.search(item_name, options)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        }
    }
}
