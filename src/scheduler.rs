//! Single-shot cancellable deferred tasks on host-supplied time.
//!
//! The engine never reads a clock. Hosts pass the current time in
//! milliseconds with every action and call `tick` periodically; due tasks are
//! drained in due-time order. Scheduling a task that is already pending
//! replaces it, so a burst of edits collapses into one run after the last
//! edit plus the delay.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    /// Debounced write of the current document.
    Autosave,
    /// Second placement pass once the host has rendered the cards.
    MeasureAndPlace,
}

/// Identifies one scheduling of a task; stale after a reschedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    task: Task,
    generation: u64,
}

impl TaskHandle {
    pub fn task(&self) -> Task {
        self.task
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTask {
    due_ms: u64,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: HashMap<Task, PendingTask>,
    generation: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)starts `task` to run `delay` after `now_ms`, replacing any pending run.
    pub fn schedule(&mut self, task: Task, now_ms: u64, delay: Duration) -> TaskHandle {
        self.generation += 1;
        let due_ms = now_ms.saturating_add(delay.as_millis() as u64);
        let replaced = self
            .pending
            .insert(
                task,
                PendingTask {
                    due_ms,
                    generation: self.generation,
                },
            )
            .is_some();
        tracing::trace!(?task, due_ms, replaced, "scheduler: scheduled");
        TaskHandle {
            task,
            generation: self.generation,
        }
    }

    /// Cancels the run identified by `handle`. Returns `false` if it already
    /// ran or was superseded.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.pending.get(&handle.task) {
            Some(pending) if pending.generation == handle.generation => {
                self.pending.remove(&handle.task);
                true
            }
            _ => false,
        }
    }

    /// Cancels whatever run of `task` is pending.
    pub fn cancel_task(&mut self, task: Task) -> bool {
        self.pending.remove(&task).is_some()
    }

    #[must_use]
    pub fn is_pending(&self, task: Task) -> bool {
        self.pending.contains_key(&task)
    }

    #[must_use]
    pub fn due_at(&self, task: Task) -> Option<u64> {
        self.pending.get(&task).map(|pending| pending.due_ms)
    }

    /// Earliest due time across all pending tasks.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.pending.values().map(|pending| pending.due_ms).min()
    }

    /// Removes and returns every task due at `now_ms`, earliest first.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<Task> {
        let mut due: Vec<(u64, Task)> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.due_ms <= now_ms)
            .map(|(task, pending)| (pending.due_ms, *task))
            .collect();
        due.sort();
        for (_, task) in &due {
            self.pending.remove(task);
        }
        due.into_iter().map(|(_, task)| task).collect()
    }
}
