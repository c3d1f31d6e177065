//! Metrics for detached cache tasks.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for the background task executor.
pub mod names {
    /// Total detached cache tasks, labelled by task and outcome.
    pub const CACHE_TASKS_TOTAL: &str = "echoes_cache_tasks_total";
    /// Cache task run time in seconds.
    pub const CACHE_TASK_DURATION_SECONDS: &str = "echoes_cache_task_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::CACHE_TASKS_TOTAL,
        "Total number of detached cache tasks by outcome (completed, panicked, timed_out, dropped)"
    );
    describe_histogram!(
        names::CACHE_TASK_DURATION_SECONDS,
        "Cache task run time in seconds"
    );
}

/// Outcome of a detached task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Panicked,
    TimedOut,
    Dropped,
}

impl TaskOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Panicked => "panicked",
            Self::TimedOut => "timed_out",
            Self::Dropped => "dropped",
        }
    }
}

/// Background task metrics recorder.
#[derive(Clone, Copy)]
pub struct TaskMetrics;

impl TaskMetrics {
    pub fn record(task: &'static str, outcome: TaskOutcome) {
        counter!(names::CACHE_TASKS_TOTAL, "task" => task, "outcome" => outcome.as_str()).increment(1);
    }

    pub fn duration(task: &'static str, elapsed: Duration) {
        histogram!(names::CACHE_TASK_DURATION_SECONDS, "task" => task).record(elapsed.as_secs_f64());
    }
}
