//! One-shot deferred tasks.
//!
//! The controller only needs "run this later, off my thread". Production uses
//! [`BackgroundScheduler`], a single worker thread on a monotonic clock; tests
//! use [`ManualScheduler`] and decide themselves when time passes.

mod background;
mod manual;

pub use background::BackgroundScheduler;
pub use manual::ManualScheduler;

use anyhow::Result;
use std::fmt;
use std::time::Instant;

/// Work handed to a scheduler. Runs at most once.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle of a scheduled task, unique per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Accepts "run `task` no earlier than `run_at`" without blocking the caller.
pub trait Scheduler: Send + Sync {
    fn schedule_at(&self, run_at: Instant, task: Task) -> Result<TaskId>;
}

impl<S: Scheduler + ?Sized> Scheduler for std::sync::Arc<S> {
    fn schedule_at(&self, run_at: Instant, task: Task) -> Result<TaskId> {
        (**self).schedule_at(run_at, task)
    }
}
