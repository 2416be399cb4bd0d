//! Job: an ordered, fixed-membership collection of tasks.
//!
//! A job is shared as `Arc<Job>` between the runner that executes it and any
//! readers polling for partial results. Each task sits behind its own lock, so
//! tasks executing concurrently within a batch never contend with each other and
//! readers always see a consistent per-task snapshot. Membership never changes
//! after creation; only task status, result and timing are mutated in place.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::{Item, JobId, JobSummary, ResultRecord, Task, TaskStatus};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Task records are plain data; a panic mid-update leaves at worst a stale status.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct JobTiming {
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

/// A batch of tasks created together
#[derive(Debug)]
pub struct Job {
    id: JobId,
    tasks: Vec<Mutex<Task>>,
    created_at: DateTime<Utc>,
    timing: Mutex<JobTiming>,
    cancelled: AtomicBool,
}

impl Job {
    pub(crate) fn new(id: JobId, tasks: Vec<Task>) -> Self {
        Self {
            id,
            tasks: tasks.into_iter().map(Mutex::new).collect(),
            created_at: Utc::now(),
            timing: Mutex::new(JobTiming::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Job ID
    pub fn id(&self) -> JobId {
        self.id
    }

    /// When the job was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When execution started, if it has
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.timing).started_at
    }

    /// When the last batch finished, if it has
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.timing).completed_at
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True for a job without tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Snapshot of every task, in execution order
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.iter().map(|t| lock(t).clone()).collect()
    }

    /// Snapshot of one task
    pub fn task(&self, index: usize) -> Option<Task> {
        self.tasks.get(index).map(|t| lock(t).clone())
    }

    /// Current status of every task, in execution order
    pub fn statuses(&self) -> Vec<TaskStatus> {
        self.tasks.iter().map(|t| lock(t).status).collect()
    }

    fn count(&self, pred: impl Fn(TaskStatus) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(lock(t).status)).count()
    }

    /// Tasks completed by a provider call
    pub fn completed_count(&self) -> usize {
        self.count(|s| s == TaskStatus::Completed)
    }

    /// Tasks served from cache
    pub fn cached_count(&self) -> usize {
        self.count(|s| s == TaskStatus::Cached)
    }

    /// Tasks carrying a result (completed or cached)
    pub fn loaded_count(&self) -> usize {
        self.count(TaskStatus::has_result)
    }

    /// Tasks that exhausted their retries
    pub fn failed_count(&self) -> usize {
        self.count(|s| s == TaskStatus::Failed)
    }

    /// Tasks in a terminal state
    pub fn terminal_count(&self) -> usize {
        self.count(TaskStatus::is_terminal)
    }

    /// Share of terminal tasks, 0.0 to 100.0 (an empty job counts as 100)
    pub fn progress_percent(&self) -> f64 {
        if self.tasks.is_empty() {
            return 100.0;
        }
        self.terminal_count() as f64 / self.tasks.len() as f64 * 100.0
    }

    /// True iff every task is Completed, Cached or Failed
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(|t| lock(t).status.is_terminal())
    }

    /// True if the latest run was cancelled before every task was dispatched
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Item of the first task currently executing
    pub fn current_item(&self) -> Option<Item> {
        self.tasks.iter().find_map(|t| {
            let task = lock(t);
            (task.status == TaskStatus::InProgress).then(|| task.item.clone())
        })
    }

    /// Results of every Completed or Cached task, in execution order.
    ///
    /// Safe to call mid-run; pending, running and failed tasks are omitted.
    pub fn completed_results(&self) -> Vec<ResultRecord> {
        self.tasks
            .iter()
            .filter_map(|t| {
                let task = lock(t);
                let result = task.result.clone()?;
                task.status.has_result().then(|| ResultRecord {
                    task_id: task.task_id,
                    item: task.item.clone(),
                    result,
                    from_cache: task.status == TaskStatus::Cached,
                })
            })
            .collect()
    }

    /// Per-status counts
    pub fn summary(&self) -> JobSummary {
        let mut summary = JobSummary {
            job_id: self.id,
            total: self.tasks.len(),
            completed: 0,
            cached: 0,
            failed: 0,
            in_progress: 0,
            pending: 0,
            progress_percent: 0.0,
            is_complete: false,
            cancelled: self.is_cancelled(),
        };
        for status in self.statuses() {
            match status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Cached => summary.cached += 1,
                TaskStatus::Failed => summary.failed += 1,
            }
        }
        let terminal = summary.completed + summary.cached + summary.failed;
        summary.is_complete = terminal == summary.total;
        summary.progress_percent = if summary.total == 0 {
            100.0
        } else {
            terminal as f64 / summary.total as f64 * 100.0
        };
        summary
    }

    /// Apply `f` to one task under its lock
    pub(crate) fn update_task<R>(&self, index: usize, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
        self.tasks.get(index).map(|t| f(&mut lock(t)))
    }

    pub(crate) fn mark_started(&self) {
        let mut timing = lock(&self.timing);
        if timing.started_at.is_none() {
            timing.started_at = Some(Utc::now());
        }
    }

    pub(crate) fn mark_finished(&self) {
        lock(&self.timing).completed_at = Some(Utc::now());
    }

    pub(crate) fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// A later run that dispatched every task supersedes an earlier cancellation
    pub(crate) fn clear_cancelled(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskId;

    fn job_with(statuses: &[TaskStatus]) -> Job {
        let tasks = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut task = Task::new(TaskId(i as u64), Item::new(format!("item-{i}")));
                match status {
                    TaskStatus::Pending => {}
                    TaskStatus::InProgress => task.mark_in_progress(),
                    TaskStatus::Completed => task.mark_completed(serde_json::json!(i)),
                    TaskStatus::Cached => task.mark_cached(serde_json::json!(i)),
                    TaskStatus::Failed => task.mark_failed("nope".into()),
                }
                task
            })
            .collect();
        Job::new(JobId(1), tasks)
    }

    #[test]
    fn complete_iff_every_task_terminal() {
        use TaskStatus::*;
        let cases = vec![
            (vec![Completed, Cached, Failed], true),
            (vec![Failed, Failed], true),
            (vec![Completed, Pending], false),
            (vec![Cached, InProgress], false),
            (vec![Pending], false),
        ];
        for (statuses, expected) in cases {
            let job = job_with(&statuses);
            assert_eq!(
                job.is_complete(),
                expected,
                "statuses {statuses:?} should give is_complete={expected}"
            );
            assert_eq!(job.summary().is_complete, expected);
        }
    }

    #[test]
    fn empty_job_is_complete() {
        let job = job_with(&[]);
        assert!(job.is_complete());
        assert_eq!(job.progress_percent(), 100.0);
    }

    #[test]
    fn summary_counts_each_status() {
        use TaskStatus::*;
        let job = job_with(&[Completed, Cached, Cached, Failed, InProgress, Pending, Pending]);
        let summary = job.summary();
        assert_eq!(summary.total, 7);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.cached, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.pending, 2);
        assert!((summary.progress_percent - 4.0 / 7.0 * 100.0).abs() < 1e-9);
        assert_eq!(job.loaded_count(), 3);
    }

    #[test]
    fn completed_results_omit_unfinished_and_failed() {
        use TaskStatus::*;
        let job = job_with(&[Completed, Failed, Cached, Pending, InProgress]);
        let results = job.completed_results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].item.name, "item-0");
        assert!(!results[0].from_cache);
        assert_eq!(results[1].item.name, "item-2");
        assert!(results[1].from_cache);
    }

    #[test]
    fn current_item_is_first_in_progress() {
        use TaskStatus::*;
        let job = job_with(&[Completed, InProgress, InProgress]);
        assert_eq!(job.current_item().unwrap().name, "item-1");
        assert!(job_with(&[Completed]).current_item().is_none());
    }

    #[test]
    fn update_task_mutates_in_place() {
        let job = job_with(&[TaskStatus::Pending]);
        job.update_task(0, |t| t.mark_completed(serde_json::json!("ok")));
        assert_eq!(job.task(0).unwrap().status, TaskStatus::Completed);
        assert!(job.update_task(5, |_| ()).is_none());
    }
}
