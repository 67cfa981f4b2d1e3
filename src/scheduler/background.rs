use super::{Scheduler, Task, TaskId};
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

enum SchedulerMessage {
    Schedule(PendingTask),
    Shutdown,
}

struct PendingTask {
    id: TaskId,
    run_at: Instant,
    task: Task,
}

// BinaryHeap is a max-heap; invert so the earliest deadline pops first and
// equal deadlines keep submission order.
impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .run_at
            .cmp(&self.run_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingTask {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PendingTask {}

/// Deferred-task runner backed by one worker thread.
///
/// Start it once at process start and share it by reference. Dropping it
/// stops the worker; tasks that were not due yet are discarded.
pub struct BackgroundScheduler {
    sender: Sender<SchedulerMessage>,
    next_id: AtomicU64,
    pending: Arc<AtomicUsize>,
    handle: Option<thread::JoinHandle<()>>,
}

impl BackgroundScheduler {
    pub fn start() -> Result<Self> {
        let (sender, receiver) = unbounded::<SchedulerMessage>();
        let pending = Arc::new(AtomicUsize::new(0));
        let worker_pending = pending.clone();
        let handle = thread::Builder::new()
            .name("quietbreak-scheduler".to_string())
            .spawn(move || {
                let mut queue: BinaryHeap<PendingTask> = BinaryHeap::new();
                loop {
                    while queue
                        .peek()
                        .is_some_and(|next| next.run_at <= Instant::now())
                    {
                        if let Some(due) = queue.pop() {
                            worker_pending.fetch_sub(1, Ordering::Relaxed);
                            run_task(due);
                        }
                    }

                    let message = match queue.peek() {
                        Some(next) => receiver
                            .recv_timeout(next.run_at.saturating_duration_since(Instant::now())),
                        None => receiver
                            .recv()
                            .map_err(|_| RecvTimeoutError::Disconnected),
                    };
                    match message {
                        Ok(SchedulerMessage::Schedule(task)) => queue.push(task),
                        Ok(SchedulerMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                            break
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
                if !queue.is_empty() {
                    log_debug(&format!(
                        "scheduler stopping with {} task(s) not yet due",
                        queue.len()
                    ));
                }
                worker_pending.store(0, Ordering::Relaxed);
            })
            .context("failed to spawn scheduler thread")?;

        Ok(Self {
            sender,
            next_id: AtomicU64::new(1),
            pending,
            handle: Some(handle),
        })
    }

    /// Tasks queued but not yet run.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

fn run_task(due: PendingTask) {
    let late_ms = due.run_at.elapsed().as_millis();
    log_debug(&format!("running {} ({late_ms}ms after deadline)", due.id));
    if panic::catch_unwind(AssertUnwindSafe(due.task)).is_err() {
        log_debug(&format!("{} panicked; scheduler keeps running", due.id));
        tracing::error!(task = due.id.get(), "scheduled task panicked");
    }
}

impl Scheduler for BackgroundScheduler {
    fn schedule_at(&self, run_at: Instant, task: Task) -> Result<TaskId> {
        let id = TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.pending.fetch_add(1, Ordering::Relaxed);
        if self
            .sender
            .send(SchedulerMessage::Schedule(PendingTask { id, run_at, task }))
            .is_err()
        {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            return Err(anyhow!("scheduler worker is not running"));
        }
        Ok(id)
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        let _ = self.sender.send(SchedulerMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
