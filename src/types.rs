//! Core types for progressive-lookup

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::SearchPayload;

/// Unique identifier for a job (unique per [`Processor`](crate::Processor))
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("job-").unwrap_or(s);
        Ok(Self(digits.parse()?))
    }
}

/// Unique identifier for a task (unique per [`Processor`](crate::Processor))
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Priority bonus per weight point when deriving priority from a base value
pub const WEIGHT_PRIORITY_FACTOR: i32 = 5;

/// A unit of requested work
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Lookup key, unique within a job (case-insensitive)
    pub name: String,
    /// Name to show to users, when it differs from the lookup key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Severity/importance signal, typically 0–6
    #[serde(default)]
    pub weight: u8,
    /// Scheduling priority; higher runs earlier
    #[serde(default)]
    pub priority: i32,
    /// Optional classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Item {
    /// Item with weight 0 and priority 0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            weight: 0,
            priority: 0,
            category: None,
        }
    }

    /// Item whose priority is `base_priority + weight * 5`, saturating at the `i32` bounds
    pub fn weighted(name: impl Into<String>, weight: u8, base_priority: i32) -> Self {
        Self {
            weight,
            priority: base_priority
                .saturating_add(i32::from(weight).saturating_mul(WEIGHT_PRIORITY_FACTOR)),
            ..Self::new(name)
        }
    }

    /// Override the priority directly
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the weight without touching the priority
    pub fn with_weight(mut self, weight: u8) -> Self {
        self.weight = weight;
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Display name, falling back to the lookup name
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Stable sort by priority, then weight, both descending.
///
/// Items that compare equal keep their input order.
pub fn sort_by_priority(items: &mut [Item]) {
    items.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.weight.cmp(&a.weight))
    });
}

/// Task status
///
/// ```text
/// Pending -> InProgress -> Completed | Cached | Failed
/// ```
/// A failing attempt with retries left keeps the task InProgress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not dispatched yet
    Pending,
    /// Being executed (including retry waits)
    InProgress,
    /// Provider returned a result
    Completed,
    /// Result served from cache, no provider call
    Cached,
    /// Retries exhausted
    Failed,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Cached | TaskStatus::Failed
        )
    }

    /// Does a task in this state carry a result?
    pub fn has_result(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cached)
    }
}

/// Execution record of one item within one job
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    /// Task ID
    pub task_id: TaskId,
    /// The item this task executes
    pub item: Item,
    /// Current status
    pub status: TaskStatus,
    /// Provider payload, present only when Completed or Cached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SearchPayload>,
    /// Last error message, present only when Failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the task was dispatched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Retries performed so far (attempts = retry_count + 1)
    pub retry_count: u32,
}

impl Task {
    /// Fresh pending task
    pub fn new(task_id: TaskId, item: Item) -> Self {
        Self {
            task_id,
            item,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
        }
    }

    /// Wall-clock time between dispatch and completion
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    pub(crate) fn mark_in_progress(&mut self) {
        self.status = TaskStatus::InProgress;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn mark_cached(&mut self, payload: SearchPayload) {
        self.status = TaskStatus::Cached;
        self.result = Some(payload);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn mark_completed(&mut self, payload: SearchPayload) {
        self.status = TaskStatus::Completed;
        self.result = Some(payload);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn mark_failed(&mut self, error: String) {
        self.status = TaskStatus::Failed;
        self.result = None;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }
}

/// One loaded result, as returned by the partial-results views
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Task that produced the result
    pub task_id: TaskId,
    /// The item the result belongs to
    pub item: Item,
    /// Provider payload
    pub result: SearchPayload,
    /// True when served from cache
    pub from_cache: bool,
}

/// Per-status counts for a job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job ID
    pub job_id: JobId,
    /// Number of tasks
    pub total: usize,
    /// Tasks completed by a provider call
    pub completed: usize,
    /// Tasks served from cache
    pub cached: usize,
    /// Tasks that exhausted their retries
    pub failed: usize,
    /// Tasks currently executing
    pub in_progress: usize,
    /// Tasks not dispatched yet
    pub pending: usize,
    /// Share of tasks in a terminal state (0.0 to 100.0)
    pub progress_percent: f64,
    /// True once every task is terminal
    pub is_complete: bool,
    /// True if the run was cancelled before every task was dispatched
    pub cancelled: bool,
}

/// Event emitted during job execution
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job created from a list of items
    JobCreated {
        /// Job ID
        job_id: JobId,
        /// Number of tasks
        total: usize,
    },

    /// A task reached Completed or Cached
    TaskCompleted {
        /// Job ID
        job_id: JobId,
        /// Task ID
        task_id: TaskId,
        /// Item name
        item: String,
        /// True when served from cache
        cached: bool,
    },

    /// A provider call failed and will be retried
    TaskRetrying {
        /// Job ID
        job_id: JobId,
        /// Task ID
        task_id: TaskId,
        /// Item name
        item: String,
        /// Retry number about to run (1-based)
        retry: u32,
        /// Error of the failed attempt
        error: String,
    },

    /// A task exhausted its retries
    TaskFailed {
        /// Job ID
        job_id: JobId,
        /// Task ID
        task_id: TaskId,
        /// Item name
        item: String,
        /// Final error message
        error: String,
    },

    /// A batch finished (emitted once per batch, in batch order)
    BatchCompleted {
        /// Job ID
        job_id: JobId,
        /// Zero-based batch index
        batch_index: usize,
        /// Number of batches in the job
        batch_count: usize,
        /// Share of terminal tasks after this batch (0.0 to 100.0)
        progress_percent: f64,
    },

    /// Every task of the job is terminal
    JobCompleted {
        /// Job ID
        job_id: JobId,
        /// Number of tasks
        total: usize,
        /// Tasks with a result (completed or cached)
        loaded: usize,
        /// Tasks that failed
        failed: usize,
    },

    /// The run was cancelled; undispatched tasks stay pending
    JobCancelled {
        /// Job ID
        job_id: JobId,
        /// Tasks still pending
        pending: usize,
    },
}
