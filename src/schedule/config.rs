use crate::foundation::core::Millis;
use crate::foundation::error::{WobblazError, WobblazResult};

/// Thresholds for [`FrameScheduler::is_under_pressure`](crate::FrameScheduler::is_under_pressure).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PressureThresholds {
    /// Rolling average frame time above which the scheduler is under pressure.
    pub avg_frame_ms: Millis,
    /// Queue depth above which the scheduler is under pressure.
    pub queue_depth: usize,
    /// Dropped frames within the rolling window above which the scheduler is under pressure.
    pub dropped_frames: usize,
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            avg_frame_ms: 14.0,
            queue_depth: 10,
            dropped_frames: 5,
        }
    }
}

/// Thresholds for [`FrameScheduler::recommended_quality`](crate::FrameScheduler::recommended_quality).
///
/// Both bounds are exclusive: `high` needs frame time below `high_frame_ms` *and* depth below
/// `high_queue_depth`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Frame time bound for high quality.
    pub high_frame_ms: Millis,
    /// Queue depth bound for high quality.
    pub high_queue_depth: usize,
    /// Frame time bound for medium quality.
    pub medium_frame_ms: Millis,
    /// Queue depth bound for medium quality.
    pub medium_queue_depth: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            high_frame_ms: 8.0,
            high_queue_depth: 3,
            medium_frame_ms: 12.0,
            medium_queue_depth: 8,
        }
    }
}

/// Scheduler tuning. [`Default`] is calibrated for a 60Hz display.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Duration of one display frame.
    pub frame_target_ms: Millis,
    /// Slack reserved for the browser's own work each frame.
    pub safety_margin_ms: Millis,
    /// No task starts once the remaining budget is at or below this.
    pub min_budget_ms: Millis,
    /// Number of frame deltas kept for the rolling average.
    pub history_len: usize,
    /// A frame counts as dropped when its delta exceeds `frame_target_ms * dropped_frame_factor`.
    pub dropped_frame_factor: f64,
    /// Deadline extensions granted to a stale task before it is dropped.
    pub max_retries: u32,
    /// How far past "now" a stale task's deadline moves on retry.
    pub retry_extension_ms: Millis,
    /// Cost assumed for a task scheduled without an estimate.
    pub default_cost_ms: Millis,
    /// Deadline offset for a task scheduled without one.
    pub default_deadline_ms: Millis,
    /// Weight of the newest observation in the cost moving average.
    pub cost_ema_alpha: f64,
    /// Upper bound on remembered per-id cost estimates.
    pub max_learned_costs: usize,
    /// See [`PressureThresholds`].
    pub pressure: PressureThresholds,
    /// See [`QualityThresholds`].
    pub quality: QualityThresholds,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_target_ms: 1000.0 / 60.0,
            safety_margin_ms: 2.0,
            min_budget_ms: 1.0,
            history_len: 60,
            dropped_frame_factor: 1.2,
            max_retries: 3,
            retry_extension_ms: 100.0,
            default_cost_ms: 5.0,
            default_deadline_ms: 1000.0,
            cost_ema_alpha: 0.2,
            max_learned_costs: 256,
            pressure: PressureThresholds::default(),
            quality: QualityThresholds::default(),
        }
    }
}

impl SchedulerConfig {
    /// Defaults rescaled for a display refreshing at `hz`.
    ///
    /// Every per-frame time threshold scales by `60 / hz`; queue depths, retry policy and
    /// deadlines stay as they are.
    pub fn for_refresh_rate(hz: f64) -> WobblazResult<Self> {
        if !(hz.is_finite() && hz > 0.0) {
            return Err(WobblazError::config(format!(
                "refresh rate must be a positive number, got {hz}"
            )));
        }
        let base = Self::default();
        let scale = 60.0 / hz;
        let cfg = Self {
            frame_target_ms: 1000.0 / hz,
            safety_margin_ms: base.safety_margin_ms * scale,
            pressure: PressureThresholds {
                avg_frame_ms: base.pressure.avg_frame_ms * scale,
                ..base.pressure
            },
            quality: QualityThresholds {
                high_frame_ms: base.quality.high_frame_ms * scale,
                medium_frame_ms: base.quality.medium_frame_ms * scale,
                ..base.quality
            },
            ..base
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json(json: &str) -> WobblazResult<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Budget a frame starts with.
    pub fn frame_budget_ms(&self) -> Millis {
        self.frame_target_ms - self.safety_margin_ms
    }

    /// Frame delta above which a frame counts as dropped.
    pub fn dropped_frame_threshold_ms(&self) -> Millis {
        self.frame_target_ms * self.dropped_frame_factor
    }

    /// Reject configurations the drain loop cannot work with.
    pub fn validate(&self) -> WobblazResult<()> {
        if !(self.frame_target_ms.is_finite() && self.frame_target_ms > 0.0) {
            return Err(WobblazError::config("frame_target_ms must be positive"));
        }
        if self.safety_margin_ms < 0.0 || self.min_budget_ms < 0.0 {
            return Err(WobblazError::config(
                "safety_margin_ms and min_budget_ms must be non-negative",
            ));
        }
        if self.frame_budget_ms() <= self.min_budget_ms {
            return Err(WobblazError::config(
                "frame_target_ms must exceed safety_margin_ms + min_budget_ms",
            ));
        }
        if self.history_len == 0 {
            return Err(WobblazError::config("history_len must be at least 1"));
        }
        if !(self.cost_ema_alpha > 0.0 && self.cost_ema_alpha <= 1.0) {
            return Err(WobblazError::config("cost_ema_alpha must be in (0, 1]"));
        }
        if self.dropped_frame_factor < 1.0 {
            return Err(WobblazError::config("dropped_frame_factor must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/config.rs"]
mod tests;
