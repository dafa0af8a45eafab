use std::cmp::Ordering;
use std::fmt;

use crate::foundation::core::{Millis, Priority};

/// Deferred unit of animation work. An `Err` is logged and the task discarded.
pub type TaskWork = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Scheduling parameters for [`FrameScheduler::schedule`](crate::FrameScheduler::schedule).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TaskOptions {
    /// Service order within a frame.
    pub priority: Priority,
    /// Predicted run time. `None` uses the learned estimate for this id, else the default.
    pub estimated_cost_ms: Option<Millis>,
    /// Absolute deadline. `None` means "now + default deadline".
    pub deadline: Option<Millis>,
}

impl TaskOptions {
    /// Options at `priority` with default cost and deadline.
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    /// Set the cost estimate.
    pub fn cost(mut self, ms: Millis) -> Self {
        self.estimated_cost_ms = Some(ms.max(0.0));
        self
    }

    /// Set the absolute deadline.
    pub fn deadline(mut self, at: Millis) -> Self {
        self.deadline = Some(at);
        self
    }
}

/// Read-only view of a pending task.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TaskInfo {
    /// Task key.
    pub id: String,
    /// Current priority.
    pub priority: Priority,
    /// Current (possibly extended) deadline.
    pub deadline: Millis,
    /// Current cost estimate.
    pub estimated_cost_ms: Millis,
    /// Deadline extensions granted so far.
    pub retry_count: u32,
}

pub(crate) struct AnimationTask {
    pub(crate) id: String,
    pub(crate) priority: Priority,
    pub(crate) work: TaskWork,
    pub(crate) deadline: Millis,
    pub(crate) estimated_cost: Millis,
    pub(crate) retry_count: u32,
    // Position in its priority band; re-insertion after a retry takes a fresh one.
    pub(crate) seq: u64,
    // Frame counter at scheduling time; tasks never run in the frame that created them.
    pub(crate) scheduled_in_frame: u64,
}

impl AnimationTask {
    pub(crate) fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id.clone(),
            priority: self.priority,
            deadline: self.deadline,
            estimated_cost_ms: self.estimated_cost,
            retry_count: self.retry_count,
        }
    }

    pub(crate) fn queue_entry(&self) -> QueueEntry {
        QueueEntry {
            priority: self.priority,
            seq: self.seq,
            id: self.id.clone(),
        }
    }

    pub(crate) fn is_expired(&self, now: Millis, max_retries: u32) -> bool {
        now > self.deadline && self.retry_count >= max_retries
    }
}

impl fmt::Debug for AnimationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("deadline", &self.deadline)
            .field("estimated_cost", &self.estimated_cost)
            .field("retry_count", &self.retry_count)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// Heap entry. A max-heap of these pops the highest priority first and, within a priority,
/// the smallest sequence number first.
///
/// Entries are deleted lazily: one is live only while the task map holds a task with the same
/// id *and* sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QueueEntry {
    pub(crate) priority: Priority,
    pub(crate) seq: u64,
    pub(crate) id: String,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
