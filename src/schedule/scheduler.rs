use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::rc::Rc;

use crate::env::clock::Clock;
use crate::foundation::core::{Millis, Priority, Quality};
use crate::schedule::config::SchedulerConfig;
use crate::schedule::task::{AnimationTask, QueueEntry, TaskInfo, TaskOptions, TaskWork};

const SOON_DEADLINE_MS: Millis = 100.0;
const BACKGROUND_DEADLINE_MS: Millis = 5000.0;

// A panic inside work counts as a failed task so the held entries and the frame loop survive.
fn run_work(work: TaskWork) -> anyhow::Result<()> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Err(anyhow::anyhow!("task panicked: {msg}"))
        }
    }
}

/// Outcome of one [`FrameScheduler::on_frame`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct FrameReport {
    /// Frame counter after this tick.
    pub frame_index: u64,
    /// The loop is suspended; nothing ran.
    pub paused: bool,
    /// Tasks whose work returned `Ok`.
    pub executed: usize,
    /// Tasks whose work returned `Err` (discarded).
    pub failed: usize,
    /// Stale tasks granted a deadline extension.
    pub retried: usize,
    /// Stale tasks dropped after exhausting retries.
    pub expired: usize,
    /// Draining stopped because the next task did not fit the remaining budget.
    pub deferred: bool,
    /// Measured time spent inside task work.
    pub spent_ms: Millis,
    /// Budget left when draining stopped.
    pub remaining_budget_ms: Millis,
    /// Tasks still pending after the tick.
    pub queued: usize,
}

impl FrameReport {
    /// Whether the host should request another frame callback.
    pub fn wants_next_frame(&self) -> bool {
        !self.paused
    }
}

/// Rolling scheduler statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct SchedulerStats {
    /// Mean of the last `history_len` frame deltas (0 before two frames were seen).
    pub average_frame_time_ms: Millis,
    /// Dropped frames within the rolling window.
    pub dropped_frames: usize,
    /// Dropped frames since construction.
    pub total_dropped_frames: u64,
    /// Pending tasks.
    pub queued_tasks: usize,
    /// Tasks that ran successfully since construction.
    pub completed_tasks: u64,
    /// Mean measured cost of recently completed tasks.
    pub average_task_cost_ms: Millis,
    /// Frames ticked so far (paused ticks excluded).
    pub frame_index: u64,
}

/// Priority-queued, deadline-aware task scheduler drained once per display frame.
///
/// Cloning yields another handle to the same scheduler, so task work may schedule or cancel
/// tasks while the frame is draining. Newly scheduled tasks always wait for the next frame.
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Rc<RefCell<SchedulerState>>,
}

struct SchedulerState {
    config: SchedulerConfig,
    clock: Rc<dyn Clock>,

    tasks: HashMap<String, AnimationTask>,
    queue: BinaryHeap<QueueEntry>,
    next_seq: u64,
    learned_costs: HashMap<String, Millis>,

    frame_deltas: VecDeque<Millis>,
    task_costs: VecDeque<Millis>,
    last_frame_at: Option<Millis>,
    frame_index: u64,
    total_dropped: u64,
    completed: u64,
    paused: bool,
}

enum DrainStep {
    Run(AnimationTask),
    Continue,
    Stop,
}

impl FrameScheduler {
    /// Create a scheduler reading time from `clock`.
    pub fn new(config: SchedulerConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerState {
                config,
                clock,
                tasks: HashMap::new(),
                queue: BinaryHeap::new(),
                next_seq: 0,
                learned_costs: HashMap::new(),
                frame_deltas: VecDeque::new(),
                task_costs: VecDeque::new(),
                last_frame_at: None,
                frame_index: 0,
                total_dropped: 0,
                completed: 0,
                paused: false,
            })),
        }
    }

    /// Insert or replace the task keyed by `id`.
    ///
    /// A replaced task is never run; the replacement goes behind existing tasks of equal
    /// priority.
    pub fn schedule<F>(&self, id: impl Into<String>, work: F, opts: TaskOptions)
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        self.inner
            .borrow_mut()
            .insert(id.into(), Box::new(work), opts);
    }

    /// Schedule at critical priority with a deadline one frame away.
    pub fn schedule_critical<F>(&self, id: impl Into<String>, work: F)
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let deadline = {
            let st = self.inner.borrow();
            st.clock.now_ms() + st.config.frame_target_ms
        };
        self.schedule(id, work, TaskOptions::new(Priority::Critical).deadline(deadline));
    }

    /// Schedule at high priority with a 100ms deadline.
    pub fn schedule_soon<F>(&self, id: impl Into<String>, work: F)
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let deadline = self.inner.borrow().clock.now_ms() + SOON_DEADLINE_MS;
        self.schedule(id, work, TaskOptions::new(Priority::High).deadline(deadline));
    }

    /// Schedule at low priority with a 5s deadline.
    pub fn schedule_background<F>(&self, id: impl Into<String>, work: F)
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let deadline = self.inner.borrow().clock.now_ms() + BACKGROUND_DEADLINE_MS;
        self.schedule(id, work, TaskOptions::new(Priority::Low).deadline(deadline));
    }

    /// Remove a pending task. Returns `false` when nothing was pending under `id`.
    pub fn cancel(&self, id: &str) -> bool {
        self.inner.borrow_mut().tasks.remove(id).is_some()
    }

    /// Drop every pending task.
    pub fn clear(&self) {
        let mut st = self.inner.borrow_mut();
        st.tasks.clear();
        st.queue.clear();
    }

    /// Snapshot of a pending task.
    pub fn pending(&self, id: &str) -> Option<TaskInfo> {
        self.inner.borrow().tasks.get(id).map(AnimationTask::info)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// `true` when no task is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Suspend (`false`) or resume (`true`) the frame loop. Pending tasks are kept.
    pub fn set_page_visible(&self, visible: bool) {
        let mut st = self.inner.borrow_mut();
        if st.paused == !visible {
            return;
        }
        st.paused = !visible;
        if visible {
            // The hidden gap is not a dropped frame.
            st.last_frame_at = None;
        }
        tracing::debug!(visible, queued = st.tasks.len(), "frame loop visibility changed");
    }

    /// `true` while the frame loop is suspended.
    pub fn is_paused(&self) -> bool {
        self.inner.borrow().paused
    }

    /// Run one frame: record timing, then drain tasks within the frame budget.
    ///
    /// `timestamp` is the host's frame timestamp on the scheduler clock's timeline. Task
    /// deadlines and costs are measured with the clock itself.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn on_frame(&self, timestamp: Millis) -> FrameReport {
        let (clock, min_budget, mut budget, frame_index) = {
            let mut st = self.inner.borrow_mut();
            if st.paused {
                return FrameReport {
                    frame_index: st.frame_index,
                    paused: true,
                    queued: st.tasks.len(),
                    ..FrameReport::default()
                };
            }
            st.record_frame(timestamp);
            (
                st.clock.clone(),
                st.config.min_budget_ms,
                st.config.frame_budget_ms(),
                st.frame_index,
            )
        };

        let mut report = FrameReport {
            frame_index,
            ..FrameReport::default()
        };
        let mut held = Vec::new();

        while budget > min_budget {
            let now = clock.now_ms();
            let step = self
                .inner
                .borrow_mut()
                .next_step(now, budget, &mut report, &mut held);
            let task = match step {
                DrainStep::Run(task) => task,
                DrainStep::Continue => continue,
                DrainStep::Stop => break,
            };

            // The borrow is released here so work can reach back into the scheduler.
            let AnimationTask {
                id,
                work,
                estimated_cost,
                ..
            } = task;
            let started = clock.now_ms();
            let result = run_work(work);
            let elapsed = (clock.now_ms() - started).max(0.0);

            budget -= elapsed;
            report.spent_ms += elapsed;
            self.inner
                .borrow_mut()
                .finish(id, estimated_cost, elapsed, result, &mut report);
        }

        let mut st = self.inner.borrow_mut();
        st.queue.extend(held);
        report.expired += st.sweep_expired(clock.now_ms());
        st.compact_queue();
        report.remaining_budget_ms = budget;
        report.queued = st.tasks.len();
        report
    }

    /// Current rolling statistics.
    pub fn stats(&self) -> SchedulerStats {
        self.inner.borrow().stats()
    }

    /// `true` when frames are slow, the queue is deep, or frames were dropped recently.
    pub fn is_under_pressure(&self) -> bool {
        let st = self.inner.borrow();
        let s = st.stats();
        let p = &st.config.pressure;
        s.average_frame_time_ms > p.avg_frame_ms
            || s.queued_tasks > p.queue_depth
            || s.dropped_frames > p.dropped_frames
    }

    /// Quality tier the current load can sustain.
    pub fn recommended_quality(&self) -> Quality {
        let st = self.inner.borrow();
        let s = st.stats();
        let q = &st.config.quality;
        if s.average_frame_time_ms < q.high_frame_ms && s.queued_tasks < q.high_queue_depth {
            Quality::High
        } else if s.average_frame_time_ms < q.medium_frame_ms
            && s.queued_tasks < q.medium_queue_depth
        {
            Quality::Medium
        } else {
            Quality::Low
        }
    }

    /// Active configuration.
    pub fn config(&self) -> SchedulerConfig {
        self.inner.borrow().config.clone()
    }
}

impl SchedulerState {
    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        seq
    }

    fn insert(&mut self, id: String, work: TaskWork, opts: TaskOptions) {
        let now = self.clock.now_ms();
        let estimated_cost = opts
            .estimated_cost_ms
            .or_else(|| self.learned_costs.get(&id).copied())
            .unwrap_or(self.config.default_cost_ms);
        let deadline = opts
            .deadline
            .unwrap_or(now + self.config.default_deadline_ms);
        let seq = self.bump_seq();

        let task = AnimationTask {
            id: id.clone(),
            priority: opts.priority,
            work,
            deadline,
            estimated_cost,
            retry_count: 0,
            seq,
            scheduled_in_frame: self.frame_index,
        };
        self.queue.push(task.queue_entry());
        if self.tasks.insert(id, task).is_some() {
            tracing::trace!(seq, "replaced pending animation task");
        }
    }

    fn record_frame(&mut self, timestamp: Millis) {
        self.frame_index += 1;
        if let Some(last) = self.last_frame_at {
            let delta = (timestamp - last).max(0.0);
            self.frame_deltas.push_back(delta);
            while self.frame_deltas.len() > self.config.history_len {
                self.frame_deltas.pop_front();
            }
            if delta > self.config.dropped_frame_threshold_ms() {
                self.total_dropped += 1;
            }
        }
        self.last_frame_at = Some(timestamp);
    }

    fn pop_live(&mut self) -> Option<QueueEntry> {
        while let Some(entry) = self.queue.pop() {
            if self
                .tasks
                .get(&entry.id)
                .is_some_and(|t| t.seq == entry.seq)
            {
                return Some(entry);
            }
        }
        None
    }

    fn next_step(
        &mut self,
        now: Millis,
        budget: Millis,
        report: &mut FrameReport,
        held: &mut Vec<QueueEntry>,
    ) -> DrainStep {
        let Some(entry) = self.pop_live() else {
            return DrainStep::Stop;
        };
        let Some(task) = self.tasks.get(&entry.id) else {
            return DrainStep::Continue;
        };
        let (deadline, retries, priority, cost, born) = (
            task.deadline,
            task.retry_count,
            task.priority,
            task.estimated_cost,
            task.scheduled_in_frame,
        );

        if born >= self.frame_index {
            held.push(entry);
            return DrainStep::Continue;
        }

        if now > deadline {
            if retries < self.config.max_retries {
                let seq = self.bump_seq();
                let extension = self.config.retry_extension_ms;
                if let Some(task) = self.tasks.get_mut(&entry.id) {
                    task.retry_count += 1;
                    task.deadline = now + extension;
                    task.seq = seq;
                    self.queue.push(task.queue_entry());
                }
                report.retried += 1;
            } else {
                self.tasks.remove(&entry.id);
                report.expired += 1;
                tracing::debug!(task = %entry.id, retries, "dropping stale animation task");
            }
            return DrainStep::Continue;
        }

        if priority != Priority::Critical && cost > budget {
            self.queue.push(entry);
            report.deferred = true;
            return DrainStep::Stop;
        }

        match self.tasks.remove(&entry.id) {
            Some(task) => DrainStep::Run(task),
            None => DrainStep::Continue,
        }
    }

    fn finish(
        &mut self,
        id: String,
        estimated_cost: Millis,
        elapsed: Millis,
        result: anyhow::Result<()>,
        report: &mut FrameReport,
    ) {
        match result {
            Ok(()) => {
                let alpha = self.config.cost_ema_alpha;
                let learned = estimated_cost * (1.0 - alpha) + elapsed * alpha;
                if self.learned_costs.len() >= self.config.max_learned_costs
                    && !self.learned_costs.contains_key(&id)
                {
                    self.learned_costs.clear();
                }
                self.learned_costs.insert(id, learned);

                self.task_costs.push_back(elapsed);
                while self.task_costs.len() > self.config.history_len {
                    self.task_costs.pop_front();
                }
                self.completed += 1;
                report.executed += 1;
            }
            Err(e) => {
                let error = format!("{e:#}");
                tracing::warn!(task = %id, %error, "animation task failed; discarding");
                report.failed += 1;
            }
        }
    }

    fn sweep_expired(&mut self, now: Millis) -> usize {
        let max_retries = self.config.max_retries;
        let before = self.tasks.len();
        self.tasks.retain(|_, t| !t.is_expired(now, max_retries));
        let removed = before - self.tasks.len();
        if removed > 0 {
            tracing::debug!(removed, "swept expired animation tasks");
        }
        removed
    }

    fn compact_queue(&mut self) {
        if self.queue.len() > self.tasks.len().saturating_mul(2) + 32 {
            self.queue = self.tasks.values().map(AnimationTask::queue_entry).collect();
        }
    }

    fn stats(&self) -> SchedulerStats {
        let threshold = self.config.dropped_frame_threshold_ms();
        SchedulerStats {
            average_frame_time_ms: mean(&self.frame_deltas),
            dropped_frames: self.frame_deltas.iter().filter(|&&d| d > threshold).count(),
            total_dropped_frames: self.total_dropped,
            queued_tasks: self.tasks.len(),
            completed_tasks: self.completed,
            average_task_cost_ms: mean(&self.task_costs),
            frame_index: self.frame_index,
        }
    }
}

fn mean(xs: &VecDeque<Millis>) -> Millis {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<Millis>() / xs.len() as Millis
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/scheduler.rs"]
mod tests;
