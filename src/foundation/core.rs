use std::fmt;
use std::str::FromStr;

use crate::foundation::error::WobblazError;

/// Monotonic timestamp or duration in milliseconds (`performance.now()` units).
pub type Millis = f64;

/// Scheduling priority of an animation task. Higher variants are serviced first.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work that may slip several frames.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Work that should land within a few frames.
    High,
    /// Work that must run this frame; bypasses the per-task cost check.
    Critical,
}

/// Animation quality tier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Reduced complexity, shortest durations.
    Low,
    /// Intermediate tier.
    Medium,
    /// Full fidelity.
    High,
}

impl Quality {
    /// One tier lower, saturating at [`Quality::Low`].
    pub fn downgrade(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }

    /// Lowercase name as used in JSON and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Animation category governed by a single [`AnimationGroupConfig`](crate::AnimationGroupConfig).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Small feedback effects (button presses, ripples).
    Micro,
    /// Pointer-hover effects; require a hover-capable input.
    Hover,
    /// Enter/exit and route-level transitions.
    Transition,
    /// Scroll-linked effects (parallax, reveals).
    Scroll,
    /// Heavy multi-layer effects.
    Complex,
}

impl Category {
    /// Number of categories.
    pub const COUNT: usize = 5;

    /// All categories in declaration order.
    pub const ALL: [Category; Self::COUNT] = [
        Self::Micro,
        Self::Hover,
        Self::Transition,
        Self::Scroll,
        Self::Complex,
    ];

    /// Dense index in `0..COUNT`.
    pub fn index(self) -> usize {
        match self {
            Self::Micro => 0,
            Self::Hover => 1,
            Self::Transition => 2,
            Self::Scroll => 3,
            Self::Complex => 4,
        }
    }

    /// Lowercase name as used in JSON and CLI input.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Micro => "micro",
            Self::Hover => "hover",
            Self::Transition => "transition",
            Self::Scroll => "scroll",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = WobblazError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WobblazError::config(format!("unknown animation category '{s}'")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
