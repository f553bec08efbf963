use std::collections::VecDeque;

use serde::Serialize;

use crate::repair::EncounterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(u64);

/// One-shot overlay work the session runs after a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferredTask {
    HideTutorial,
    CloseEncounter { encounter: EncounterId },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub due_at: f32,
    pub task: DeferredTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "fate", rename_all = "snake_case")]
pub enum TaskFate {
    Fired { at: f32 },
    Cancelled { at: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub task: DeferredTask,
    pub fate: TaskFate,
}

/// Pending deferred tasks ordered by deadline, driven by the session clock.
/// Tasks with equal deadlines fire in scheduling order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskQueue {
    clock: f32,
    next_id: u64,
    pending: VecDeque<ScheduledTask>,
    /// Every fired or cancelled task. Kept for diagnostics and never pruned,
    /// so it grows for the lifetime of the queue.
    history: Vec<TaskRecord>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f32 {
        self.clock
    }

    pub fn schedule(&mut self, delay: f32, task: DeferredTask) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let due_at = self.clock + delay.max(0.0);
        let slot = self
            .pending
            .iter()
            .position(|entry| entry.due_at > due_at)
            .unwrap_or(self.pending.len());
        self.pending.insert(slot, ScheduledTask { id, due_at, task });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.cancel_where(|entry| entry.id == id) > 0
    }

    /// Drops every pending task matching `predicate`; returns how many.
    pub fn cancel_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&ScheduledTask) -> bool,
    {
        let clock = self.clock;
        let mut kept = VecDeque::with_capacity(self.pending.len());
        let mut cancelled = 0;
        for entry in self.pending.drain(..) {
            if predicate(&entry) {
                cancelled += 1;
                self.history.push(TaskRecord {
                    id: entry.id,
                    task: entry.task,
                    fate: TaskFate::Cancelled { at: clock },
                });
            } else {
                kept.push_back(entry);
            }
        }
        self.pending = kept;
        cancelled
    }

    /// Moves the clock forward and returns the tasks that came due.
    pub fn advance(&mut self, dt: f32) -> Vec<ScheduledTask> {
        self.clock += dt.max(0.0);
        let mut due = Vec::new();
        while self
            .pending
            .front()
            .is_some_and(|entry| entry.due_at <= self.clock)
        {
            let Some(entry) = self.pending.pop_front() else {
                break;
            };
            self.history.push(TaskRecord {
                id: entry.id,
                task: entry.task,
                fate: TaskFate::Fired { at: self.clock },
            });
            due.push(entry);
        }
        due
    }

    pub fn peek(&self) -> Option<&ScheduledTask> {
        self.pending.front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> impl ExactSizeIterator<Item = &ScheduledTask> {
        self.pending.iter()
    }

    /// Fired and cancelled tasks, oldest first. Diagnostics only.
    pub fn history(&self) -> &[TaskRecord] {
        &self.history
    }
}
