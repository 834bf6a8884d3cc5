//! The task queue: pending tasks, a single current-task slot, and a pause
//! deadline.
//!
//! Front insertion is the default and is meant for urgent, command-driven
//! intents. Appending is for background persona work. While paused,
//! dequeueing yields nothing but enqueueing still succeeds.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use wardens_core::{Task, TaskKind};

#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: VecDeque<Task>,
    current: Option<Task>,
    paused_until: Option<Instant>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front (next to run), or append when `at_end`.
    /// Duplicates are allowed.
    pub fn add_task(&mut self, task: Task, at_end: bool) {
        if at_end {
            self.pending.push_back(task);
        } else {
            self.pending.push_front(task);
        }
    }

    /// Insert several tasks keeping their relative order. At the front, the
    /// first element becomes the very next task.
    pub fn add_tasks(&mut self, tasks: impl IntoIterator<Item = Task>, at_end: bool) {
        if at_end {
            self.pending.extend(tasks);
        } else {
            let tasks: Vec<Task> = tasks.into_iter().collect();
            for task in tasks.into_iter().rev() {
                self.pending.push_front(task);
            }
        }
    }

    /// Pop the head unless paused. Does not touch the current slot.
    pub fn next_task(&mut self) -> Option<Task> {
        if self.is_paused() {
            return None;
        }
        self.pending.pop_front()
    }

    /// Pop the head into the current slot, only when no task is current and
    /// the queue is not paused. Returns a copy of the new current task.
    pub fn begin_next(&mut self) -> Option<Task> {
        if self.current.is_some() {
            return None;
        }
        let task = self.next_task()?;
        self.current = Some(task.clone());
        Some(task)
    }

    pub fn has_task(&self, kind: TaskKind) -> bool {
        self.pending.iter().any(|task| task.kind() == kind)
    }

    pub fn first_task_is(&self, kind: TaskKind) -> bool {
        self.pending.front().is_some_and(|task| task.kind() == kind)
    }

    /// Drop every pending task of `kind`. Returns how many were removed.
    pub fn remove_tasks_of_type(&mut self, kind: TaskKind) -> usize {
        let before = self.pending.len();
        self.pending.retain(|task| task.kind() != kind);
        before - self.pending.len()
    }

    /// Pause dequeueing for `duration` from now. The last call wins.
    pub fn block_tasks_for(&mut self, duration: Duration) {
        self.paused_until = Some(Instant::now() + duration);
    }

    pub fn is_paused(&self) -> bool {
        self.paused_until
            .is_some_and(|deadline| Instant::now() < deadline)
    }

    /// Clear pending tasks and the current slot. A task already executing
    /// runs to completion.
    pub fn drop_all_tasks(&mut self) {
        self.pending.clear();
        self.current = None;
    }

    pub fn finish_current_task(&mut self) {
        self.current = None;
    }

    pub fn set_current(&mut self, task: Task) {
        self.current = Some(task);
    }

    pub fn current(&self) -> Option<&Task> {
        self.current.as_ref()
    }

    /// True iff nothing is pending. Ignores the current slot.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.pending.iter()
    }
}

/// Shared handle to one agent's [`TaskQueue`].
///
/// The scheduler and the event handlers each hold a clone. Every method
/// takes the lock for a single list mutation and never across an await.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    inner: Arc<Mutex<TaskQueue>>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TaskQueue> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_task(&self, task: Task, at_end: bool) {
        self.lock().add_task(task, at_end);
    }

    pub fn add_tasks(&self, tasks: impl IntoIterator<Item = Task>, at_end: bool) {
        self.lock().add_tasks(tasks, at_end);
    }

    /// Enqueue `task` at the front once `delay` has passed.
    pub fn add_task_after(&self, task: Task, delay: Duration) -> JoinHandle<()> {
        let board = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            board.add_task(task, false);
        })
    }

    pub fn next_task(&self) -> Option<Task> {
        self.lock().next_task()
    }

    pub fn begin_next(&self) -> Option<Task> {
        self.lock().begin_next()
    }

    pub fn has_task(&self, kind: TaskKind) -> bool {
        self.lock().has_task(kind)
    }

    pub fn first_task_is(&self, kind: TaskKind) -> bool {
        self.lock().first_task_is(kind)
    }

    pub fn remove_tasks_of_type(&self, kind: TaskKind) -> usize {
        self.lock().remove_tasks_of_type(kind)
    }

    pub fn block_tasks_for(&self, duration: Duration) {
        self.lock().block_tasks_for(duration);
    }

    pub fn is_paused(&self) -> bool {
        self.lock().is_paused()
    }

    pub fn drop_all_tasks(&self) {
        self.lock().drop_all_tasks();
    }

    pub fn finish_current_task(&self) {
        self.lock().finish_current_task();
    }

    pub fn set_current(&self, task: Task) {
        self.lock().set_current(task);
    }

    /// Guard that clears the current slot when dropped.
    pub fn finish_guard(&self) -> FinishGuard<'_> {
        FinishGuard(self)
    }

    pub fn current(&self) -> Option<Task> {
        self.lock().current().cloned()
    }

    /// Label of the current activity, `"idle"` when there is none.
    pub fn describe_current(&self) -> String {
        self.lock()
            .current()
            .map(Task::label)
            .unwrap_or_else(|| "idle".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Copy of the pending tasks in dequeue order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().pending().cloned().collect()
    }
}

/// Clears the current slot on drop, including on panic or cancellation.
pub struct FinishGuard<'a>(&'a TaskBoard);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_current_task();
    }
}
