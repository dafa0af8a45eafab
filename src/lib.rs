//! Wobblaz keeps UI animation work inside the frame budget.
//!
//! Four cooperating pieces, each a cheap-clone handle over single-threaded shared state:
//!
//! - [`FrameScheduler`]: priority queue of per-frame work drained within a frame budget
//! - [`HintManager`]: bounded pool of `will-change` compositing hints
//! - [`FlagGovernor`]: per-category enablement, quality and capacity derived from the device
//! - [`Admission`]: RAII slot counted against a category's instance ceiling
//!
//! [`MotionRuntime`] wires them to one [`Clock`] and forwards host notifications.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod env;
pub(crate) mod flags;
pub(crate) mod hints;
mod runtime;
pub(crate) mod schedule;

pub use crate::foundation::core::{Category, Millis, Priority, Quality};
pub use crate::foundation::error::{WobblazError, WobblazResult};

pub use crate::env::clock::{Clock, ManualClock, SystemClock};
pub use crate::env::probe::{DeviceProbe, HeadlessProbe, StaticProbe};
pub use crate::env::store::{JsonFileStore, MemoryStore, OverrideStore};
pub use crate::flags::config::{AnimationGroupConfig, FeatureFlags, FlagsPatch, generate_configs};
pub use crate::flags::device::{DeviceCapabilities, GpuTier};
pub use crate::flags::environment::{
    ENV_PREFIX, EnvironmentFlags, EnvironmentOverrides, OVERRIDE_KEY,
};
pub use crate::flags::governor::{Admission, DebugInfo, FlagGovernor, SubscriptionId};
pub use crate::hints::manager::{
    HintManager, HintManagerConfig, HintOptions, HintPollReport, HintStats, HintTarget,
};
pub use crate::hints::property::{HintPriority, HintProperty, format_hint};
pub use crate::runtime::{MotionRuntime, RuntimeTick};
pub use crate::schedule::config::{PressureThresholds, QualityThresholds, SchedulerConfig};
pub use crate::schedule::scheduler::{FrameReport, FrameScheduler, SchedulerStats};
pub use crate::schedule::task::{TaskInfo, TaskOptions, TaskWork};
