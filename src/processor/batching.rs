//! Batch loop shared by the sequential and concurrent paths.
//!
//! Batches run strictly in task order (tasks are priority-sorted at job
//! creation). After each batch the progress callbacks fire exactly once and a
//! `BatchCompleted` event is broadcast; between batches the loop sleeps for the
//! configured pacing delay. The only difference between the two modes is how
//! the tasks inside one batch are awaited.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{ExecutionMode, ProgressCallback, Processor};
use crate::job::Job;
use crate::provider::SearchOptions;
use crate::types::Event;

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    /// Every batch was executed
    Finished,
    /// The cancellation token fired before every task was dispatched
    Cancelled,
}

impl Processor {
    pub(crate) async fn run_batches(
        &self,
        job: &Job,
        options: &SearchOptions,
        mode: ExecutionMode,
        callback: Option<&ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> RunOutcome {
        let batch_size = self.config.processor.batch_size.max(1);
        let total = job.len();
        let batch_count = total.div_ceil(batch_size);
        let job_id = job.id();
        let is_cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);

        job.mark_started();
        tracing::info!(
            job_id = %job_id,
            total,
            batch_count,
            batch_size,
            mode = ?mode,
            "Job started"
        );

        for batch_index in 0..batch_count {
            let start = batch_index * batch_size;
            let end = (start + batch_size).min(total);

            match mode {
                ExecutionMode::Sequential => {
                    for index in start..end {
                        if is_cancelled() {
                            break;
                        }
                        self.execute_task(job, index, options).await;
                    }
                }
                ExecutionMode::Concurrent => {
                    futures::stream::iter(start..end)
                        .take_while(|_| futures::future::ready(!is_cancelled()))
                        .map(|index| self.execute_task(job, index, options))
                        .buffer_unordered(batch_size)
                        .collect::<Vec<_>>()
                        .await;
                }
            }

            let statuses = job.statuses();
            let batch_done = statuses
                .get(start..end)
                .is_some_and(|batch| batch.iter().all(|status| status.is_terminal()));
            if !batch_done && is_cancelled() {
                return self.finish_cancelled(job);
            }

            let progress_percent = job.progress_percent();
            tracing::debug!(
                job_id = %job_id,
                batch = batch_index + 1,
                batch_count,
                progress_percent,
                "Batch completed"
            );
            if let Some(on_batch) = &self.on_batch {
                on_batch(job);
            }
            if let Some(callback) = callback {
                callback(job);
            }
            self.emit_event(Event::BatchCompleted {
                job_id,
                batch_index,
                batch_count,
                progress_percent,
            });

            let more_batches = batch_index + 1 < batch_count;
            if more_batches {
                if is_cancelled() {
                    return self.finish_cancelled(job);
                }
                let delay = self.config.processor.inter_batch_delay;
                match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = token.cancelled() => return self.finish_cancelled(job),
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
            }
        }

        job.clear_cancelled();
        job.mark_finished();
        let loaded = job.loaded_count();
        let failed = job.failed_count();
        tracing::info!(job_id = %job_id, total, loaded, failed, "Job finished");
        self.emit_event(Event::JobCompleted {
            job_id,
            total,
            loaded,
            failed,
        });
        RunOutcome::Finished
    }

    fn finish_cancelled(&self, job: &Job) -> RunOutcome {
        job.mark_cancelled();
        let pending = job.summary().pending;
        tracing::info!(job_id = %job.id(), pending, "Job cancelled");
        self.emit_event(Event::JobCancelled {
            job_id: job.id(),
            pending,
        });
        RunOutcome::Cancelled
    }
}
