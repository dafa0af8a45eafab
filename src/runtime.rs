use std::rc::Rc;

use crate::env::clock::Clock;
use crate::flags::governor::FlagGovernor;
use crate::foundation::core::Millis;
use crate::hints::manager::{HintManager, HintManagerConfig, HintPollReport};
use crate::schedule::config::SchedulerConfig;
use crate::schedule::scheduler::{FrameReport, FrameScheduler};

/// Result of one [`MotionRuntime::on_frame`] tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuntimeTick {
    /// Hint expiries and sweeps performed before draining.
    pub hints: HintPollReport,
    /// Scheduler drain outcome.
    pub frame: FrameReport,
}

/// One scheduler, hint manager and flag governor sharing a clock.
///
/// Hosts forward their frame callback, visibility changes and reduced-motion changes here
/// instead of to each manager.
#[derive(Clone)]
pub struct MotionRuntime {
    clock: Rc<dyn Clock>,
    scheduler: FrameScheduler,
    hints: HintManager,
    governor: FlagGovernor,
}

impl MotionRuntime {
    /// Build the scheduler and hint manager on `clock` next to an existing governor.
    pub fn new(
        clock: Rc<dyn Clock>,
        scheduler: SchedulerConfig,
        hints: HintManagerConfig,
        governor: FlagGovernor,
    ) -> Self {
        Self {
            scheduler: FrameScheduler::new(scheduler, clock.clone()),
            hints: HintManager::new(hints, clock.clone()),
            governor,
            clock,
        }
    }

    /// The shared frame scheduler.
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// The shared hint manager.
    pub fn hints(&self) -> &HintManager {
        &self.hints
    }

    /// The shared flag governor.
    pub fn governor(&self) -> &FlagGovernor {
        &self.governor
    }

    /// Current clock reading.
    pub fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Display-refresh callback.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn on_frame(&self, timestamp: Millis) -> RuntimeTick {
        let hints = self.hints.poll(self.clock.now_ms());
        let frame = self.scheduler.on_frame(timestamp);
        RuntimeTick { hints, frame }
    }

    /// Page visibility change; pauses the scheduler, drops hints and disables flags when hidden.
    pub fn set_page_visible(&self, visible: bool) {
        tracing::debug!(visible, "page visibility changed");
        self.scheduler.set_page_visible(visible);
        self.hints.set_page_visible(visible);
        self.governor.set_page_visible(visible);
    }

    /// `prefers-reduced-motion` change.
    pub fn set_reduced_motion(&self, reduce: bool) {
        self.governor.set_reduced_motion(reduce);
    }
}

#[cfg(test)]
#[path = "../tests/unit/runtime.rs"]
mod tests;
