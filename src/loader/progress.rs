//! Progress snapshots published by background jobs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::job::Job;
use crate::types::JobId;

/// Point-in-time progress of a job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadingProgress {
    /// Job ID
    pub job_id: JobId,
    /// Number of tasks
    pub total: usize,
    /// Tasks with a result (completed or cached)
    pub loaded: usize,
    /// Subset of `loaded` served from cache
    pub cached: usize,
    /// Tasks that exhausted their retries
    pub failed: usize,
    /// Name of the task currently executing, if any
    pub current_item_name: Option<String>,
    /// `remaining tasks * average task duration`; a rough heuristic, not measured throughput
    pub estimated_remaining_seconds: f64,
    /// True once every task is terminal
    pub is_complete: bool,
    /// True if the run was cancelled
    pub cancelled: bool,
}

impl LoadingProgress {
    /// Derive a snapshot from the job's current task states
    pub fn from_job(job: &Job, average_task_duration: Duration) -> Self {
        let summary = job.summary();
        let remaining = summary.pending + summary.in_progress;
        Self {
            job_id: job.id(),
            total: summary.total,
            loaded: summary.completed + summary.cached,
            cached: summary.cached,
            failed: summary.failed,
            current_item_name: job.current_item().map(|item| item.name),
            estimated_remaining_seconds: remaining as f64 * average_task_duration.as_secs_f64(),
            is_complete: summary.is_complete,
            cancelled: summary.cancelled,
        }
    }

    /// Tasks not yet terminal
    pub fn remaining(&self) -> usize {
        self.total - self.loaded - self.failed
    }
}

/// Message on a background job's progress channel
#[derive(Clone, Debug)]
pub(crate) enum ProgressUpdate {
    /// Snapshot after a batch, or the final one
    Snapshot(LoadingProgress),
    /// Sentinel: nothing follows
    Done,
}
