//! Scheduler for scene timers on a virtual clock.
//!
//! Every task is tagged with the generation that created it. Opening a new
//! generation drops all queued tasks, and a task from an older generation is
//! never acted on even if it is handed back to the runtime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifies the scheduled work of one node entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Repeating countdown report.
    Tick,
    /// One-shot end of the countdown.
    Expiry,
    /// Timeout handler for a zero-duration scene, run on the next dispatch.
    Immediate,
}

/// A unit of scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub generation: Generation,
    pub kind: TaskKind,
    /// Virtual time at which the task is due.
    pub due_at: Duration,
    seq: u64,
}

/// Queue of generation-tagged tasks plus the virtual clock they run on.
#[derive(Debug, Clone)]
pub struct Scheduler {
    now: Duration,
    generation: Generation,
    tick_interval: Duration,
    /// End of the current countdown, if one is running.
    deadline: Option<Duration>,
    queue: Vec<ScheduledTask>,
    next_seq: u64,
}

impl Scheduler {
    /// Create a scheduler. The tick interval is at least 1ms.
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            generation: Generation::default(),
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            deadline: None,
            queue: Vec::new(),
            next_seq: 0,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Cancel all queued work and open a new generation.
    pub fn invalidate(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.queue.clear();
        self.deadline = None;
        self.generation
    }

    /// Check if a task belongs to the current generation.
    pub fn is_current(&self, task: &ScheduledTask) -> bool {
        task.generation == self.generation
    }

    /// Start a countdown: one expiry at `now + duration` and a repeating tick.
    pub fn schedule_countdown(&mut self, duration: Duration) {
        let deadline = self.now.saturating_add(duration);
        self.deadline = Some(deadline);
        self.push(TaskKind::Expiry, deadline);
        self.schedule_tick_after(self.now);
    }

    /// Queue the next tick after one that fired at `fired_at`.
    ///
    /// No tick is queued at or past the deadline; expiry covers that instant.
    pub fn schedule_tick_after(&mut self, fired_at: Duration) {
        let Some(deadline) = self.deadline else {
            return;
        };
        let due_at = fired_at.saturating_add(self.tick_interval);
        if due_at < deadline {
            self.push(TaskKind::Tick, due_at);
        }
    }

    /// Queue the timeout handler to run on the next dispatch.
    pub fn schedule_immediate(&mut self) {
        self.push(TaskKind::Immediate, self.now);
    }

    /// Stop the countdown display, keeping any non-tick work.
    pub fn clear_countdown(&mut self) {
        self.deadline = None;
        self.queue.retain(|task| task.kind != TaskKind::Tick);
    }

    /// Time left on the current countdown.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_sub(self.now))
    }

    /// Remove the earliest task due at or before `until`, moving the clock to
    /// its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<ScheduledTask> {
        let index = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due_at <= until)
            .min_by_key(|(_, task)| (task.due_at, task.seq))
            .map(|(index, _)| index)?;

        let task = self.queue.swap_remove(index);
        self.now = self.now.max(task.due_at);
        Some(task)
    }

    /// Put back a task popped but not dispatched.
    pub fn requeue(&mut self, task: ScheduledTask) {
        if self.is_current(&task) {
            self.queue.push(task);
        }
    }

    /// Move the clock forward without dispatching anything.
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn push(&mut self, kind: TaskKind, due_at: Duration) {
        self.queue.push(ScheduledTask {
            generation: self.generation,
            kind,
            due_at,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }
}
