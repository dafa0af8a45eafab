use std::collections::BTreeMap;

use crate::flags::config::FeatureFlags;
use crate::foundation::core::Category;

/// Live instance count per category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct InstanceCounter {
    counts: [usize; Category::COUNT],
}

impl InstanceCounter {
    pub(crate) fn count(&self, category: Category) -> usize {
        self.counts[category.index()]
    }

    pub(crate) fn can_admit(&self, category: Category, flags: &FeatureFlags) -> bool {
        let cfg = flags.get(category);
        cfg.enabled && self.count(category) < cfg.max_instances
    }

    /// Increment only if [`can_admit`](Self::can_admit) holds.
    pub(crate) fn register(&mut self, category: Category, flags: &FeatureFlags) -> bool {
        if !self.can_admit(category, flags) {
            return false;
        }
        self.counts[category.index()] += 1;
        true
    }

    /// Decrement, clamped at zero.
    pub(crate) fn unregister(&mut self, category: Category) {
        let n = &mut self.counts[category.index()];
        *n = n.saturating_sub(1);
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<Category, usize> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.count(c)))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/flags/admission.rs"]
mod tests;
