use super::{Scheduler, Task, TaskId};
use crate::lock_or_recover;
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

struct Queued {
    id: TaskId,
    run_at: Instant,
    task: Task,
}

/// Scheduler whose clock only moves when the caller says so.
///
/// Tasks run on the calling thread from [`ManualScheduler::run_due`] or
/// [`ManualScheduler::run_all`]; nothing runs on its own.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<Queued>>,
    next_id: AtomicU64,
    total_scheduled: AtomicU64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks queued but not yet run.
    pub fn pending(&self) -> usize {
        lock_or_recover(&self.queue, "manual scheduler queue").len()
    }

    /// Every task ever accepted, run or not.
    pub fn total_scheduled(&self) -> u64 {
        self.total_scheduled.load(Ordering::Relaxed)
    }

    /// Earliest deadline still queued.
    pub fn next_run_at(&self) -> Option<Instant> {
        lock_or_recover(&self.queue, "manual scheduler queue")
            .iter()
            .map(|queued| queued.run_at)
            .min()
    }

    /// Run every task due at `now`, earliest first. Returns how many ran.
    pub fn run_due(&self, now: Instant) -> usize {
        let mut due = {
            let mut queue = lock_or_recover(&self.queue, "manual scheduler queue");
            let (due, later): (Vec<_>, Vec<_>) =
                queue.drain(..).partition(|queued| queued.run_at <= now);
            *queue = later;
            due
        };
        due.sort_by_key(|queued| (queued.run_at, queued.id));
        let ran = due.len();
        // Queue lock is released so tasks may schedule follow-ups.
        for queued in due {
            (queued.task)();
        }
        ran
    }

    /// Run everything queued regardless of deadline.
    pub fn run_all(&self) -> usize {
        match self.next_latest() {
            Some(latest) => self.run_due(latest),
            None => 0,
        }
    }

    fn next_latest(&self) -> Option<Instant> {
        lock_or_recover(&self.queue, "manual scheduler queue")
            .iter()
            .map(|queued| queued.run_at)
            .max()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_at(&self, run_at: Instant, task: Task) -> Result<TaskId> {
        let id = TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.total_scheduled.fetch_add(1, Ordering::Relaxed);
        lock_or_recover(&self.queue, "manual scheduler queue").push(Queued { id, run_at, task });
        Ok(id)
    }
}
