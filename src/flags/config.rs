use crate::flags::device::DeviceCapabilities;
use crate::flags::environment::EnvironmentFlags;
use crate::foundation::core::{Category, Quality};

/// Effective configuration of one animation category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnimationGroupConfig {
    /// Instances of this category may run at all.
    pub enabled: bool,
    /// Quality tier instances should render at.
    pub quality: Quality,
    /// Ceiling on concurrently admitted instances.
    pub max_instances: usize,
    /// Instances wait for viewport intersection before activating.
    pub lazy_load: bool,
    /// The category is meaningless off-screen.
    pub requires_viewport: bool,
}

impl AnimationGroupConfig {
    fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }
}

/// Per-category configuration snapshot. Handed out by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeatureFlags {
    /// [`Category::Micro`]
    pub micro: AnimationGroupConfig,
    /// [`Category::Hover`]
    pub hover: AnimationGroupConfig,
    /// [`Category::Transition`]
    pub transition: AnimationGroupConfig,
    /// [`Category::Scroll`]
    pub scroll: AnimationGroupConfig,
    /// [`Category::Complex`]
    pub complex: AnimationGroupConfig,
}

impl FeatureFlags {
    /// Configuration of `category`.
    pub fn get(&self, category: Category) -> &AnimationGroupConfig {
        match category {
            Category::Micro => &self.micro,
            Category::Hover => &self.hover,
            Category::Transition => &self.transition,
            Category::Scroll => &self.scroll,
            Category::Complex => &self.complex,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut AnimationGroupConfig {
        match category {
            Category::Micro => &mut self.micro,
            Category::Hover => &mut self.hover,
            Category::Transition => &mut self.transition,
            Category::Scroll => &mut self.scroll,
            Category::Complex => &mut self.complex,
        }
    }

    /// Copy with every category disabled, other fields untouched.
    pub fn all_disabled(&self) -> Self {
        let mut out = *self;
        for c in Category::ALL {
            let cfg = out.get_mut(c);
            *cfg = cfg.disabled();
        }
        out
    }

    /// Replace the categories present in `patch`.
    pub fn apply(&mut self, patch: &FlagsPatch) {
        for c in Category::ALL {
            if let Some(cfg) = patch.get(c) {
                *self.get_mut(c) = cfg;
            }
        }
    }
}

/// Whole-category replacements for [`FlagGovernor::update_flags`](crate::FlagGovernor::update_flags).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FlagsPatch {
    /// Replacement for [`Category::Micro`].
    pub micro: Option<AnimationGroupConfig>,
    /// Replacement for [`Category::Hover`].
    pub hover: Option<AnimationGroupConfig>,
    /// Replacement for [`Category::Transition`].
    pub transition: Option<AnimationGroupConfig>,
    /// Replacement for [`Category::Scroll`].
    pub scroll: Option<AnimationGroupConfig>,
    /// Replacement for [`Category::Complex`].
    pub complex: Option<AnimationGroupConfig>,
}

impl FlagsPatch {
    /// Patch replacing a single category.
    pub fn single(category: Category, cfg: AnimationGroupConfig) -> Self {
        let mut p = Self::default();
        *p.slot(category) = Some(cfg);
        p
    }

    fn get(&self, category: Category) -> Option<AnimationGroupConfig> {
        match category {
            Category::Micro => self.micro,
            Category::Hover => self.hover,
            Category::Transition => self.transition,
            Category::Scroll => self.scroll,
            Category::Complex => self.complex,
        }
    }

    fn slot(&mut self, category: Category) -> &mut Option<AnimationGroupConfig> {
        match category {
            Category::Micro => &mut self.micro,
            Category::Hover => &mut self.hover,
            Category::Transition => &mut self.transition,
            Category::Scroll => &mut self.scroll,
            Category::Complex => &mut self.complex,
        }
    }
}

// (capable, low-end) instance ceilings.
fn instance_ceiling(category: Category) -> (usize, usize) {
    match category {
        Category::Micro => (50, 20),
        Category::Hover => (20, 8),
        Category::Transition => (10, 4),
        Category::Scroll => (15, 6),
        Category::Complex => (5, 2),
    }
}

/// Derive every category's configuration from the environment switches and device snapshot.
///
/// Pure: identical inputs always produce identical flags.
pub fn generate_configs(env: &EnvironmentFlags, device: &DeviceCapabilities) -> FeatureFlags {
    let low_end = device.is_low_end();
    let good_gpu = device.has_good_gpu();
    let base = device.base_quality();
    let global_disabled =
        env.force_reduced_motion || device.reduced_motion || !env.enable_all;

    let group = |category: Category| {
        let prerequisite = match category {
            Category::Hover => device.hover,
            Category::Complex => !low_end,
            Category::Micro | Category::Transition | Category::Scroll => true,
        };
        let quality = match category {
            Category::Scroll if !good_gpu => base.downgrade(),
            Category::Complex if low_end => Quality::Low,
            Category::Complex if !good_gpu => base.min(Quality::Medium),
            _ => base,
        };
        let (capable, reduced) = instance_ceiling(category);
        AnimationGroupConfig {
            enabled: env.category_enabled(category) && !global_disabled && prerequisite,
            quality,
            max_instances: if low_end { reduced } else { capable },
            lazy_load: match category {
                Category::Scroll | Category::Complex => true,
                Category::Transition => low_end,
                Category::Micro | Category::Hover => false,
            },
            requires_viewport: matches!(category, Category::Scroll | Category::Complex),
        }
    };

    FeatureFlags {
        micro: group(Category::Micro),
        hover: group(Category::Hover),
        transition: group(Category::Transition),
        scroll: group(Category::Scroll),
        complex: group(Category::Complex),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/flags/config.rs"]
mod tests;
