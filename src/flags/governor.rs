use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::env::probe::DeviceProbe;
use crate::env::store::OverrideStore;
use crate::flags::admission::InstanceCounter;
use crate::flags::config::{AnimationGroupConfig, FeatureFlags, FlagsPatch, generate_configs};
use crate::flags::device::DeviceCapabilities;
use crate::flags::environment::{EnvironmentFlags, EnvironmentOverrides};
use crate::foundation::core::{Category, Quality};

/// Handle returned by [`FlagGovernor::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&FeatureFlags)>;

#[derive(Default)]
struct Listeners {
    entries: Vec<(SubscriptionId, Listener)>,
    live: BTreeSet<SubscriptionId>,
    next_id: u64,
    dispatching: bool,
    pending: Option<FeatureFlags>,
}

/// Full internal state, for diagnostics.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DebugInfo {
    /// Current snapshot.
    pub flags: FeatureFlags,
    /// Effective environment switches (base plus overrides).
    pub environment: EnvironmentFlags,
    /// Overrides layered over the base switches.
    pub overrides: EnvironmentOverrides,
    /// Device snapshot the flags were derived from.
    pub device: DeviceCapabilities,
    /// Live instances per category.
    pub instance_counts: BTreeMap<Category, usize>,
    /// Every category is force-disabled while the page is hidden.
    pub page_hidden: bool,
    /// Registered listeners.
    pub subscribers: usize,
}

struct GovernorState {
    base_env: EnvironmentFlags,
    overrides: EnvironmentOverrides,
    device: DeviceCapabilities,
    flags: FeatureFlags,
    instances: InstanceCounter,
    page_hidden: bool,
    store: Option<Rc<dyn OverrideStore>>,
}

impl GovernorState {
    fn environment(&self) -> EnvironmentFlags {
        self.base_env.with_overrides(&self.overrides)
    }

    fn recompute(&mut self) -> FeatureFlags {
        let env = self.environment();
        let flags = generate_configs(&env, &self.device);
        self.flags = if self.page_hidden {
            flags.all_disabled()
        } else {
            flags
        };
        if env.debug {
            tracing::info!(flags = ?self.flags, hidden = self.page_hidden, "animation flags recomputed");
        } else {
            tracing::debug!(hidden = self.page_hidden, "animation flags recomputed");
        }
        self.flags
    }
}

/// Owner of the animation feature flags and the per-category instance counters.
///
/// Flags are derived once from the environment switches and a device snapshot, and
/// re-derived wholesale when reduced motion, page visibility or the overrides change.
/// Readers always receive copies, so a listener never observes a half-applied update.
#[derive(Clone)]
pub struct FlagGovernor {
    inner: Rc<RefCell<GovernorState>>,
    listeners: Rc<RefCell<Listeners>>,
}

impl FlagGovernor {
    /// Governor over fixed inputs with no persisted overrides.
    pub fn new(env: EnvironmentFlags, device: DeviceCapabilities) -> Self {
        Self::build(env, EnvironmentOverrides::default(), device, None)
    }

    /// Probe the device, read persisted overrides from `store`, and derive the flags.
    ///
    /// Later [`set_environment_overrides`](Self::set_environment_overrides) calls are written
    /// back to `store`.
    pub fn load(
        base: EnvironmentFlags,
        probe: &dyn DeviceProbe,
        store: Rc<dyn OverrideStore>,
    ) -> Self {
        let overrides = EnvironmentOverrides::load(store.as_ref());
        let device = DeviceCapabilities::probe(probe);
        Self::build(base, overrides, device, Some(store))
    }

    fn build(
        base_env: EnvironmentFlags,
        overrides: EnvironmentOverrides,
        device: DeviceCapabilities,
        store: Option<Rc<dyn OverrideStore>>,
    ) -> Self {
        let env = base_env.with_overrides(&overrides);
        let mut state = GovernorState {
            base_env,
            overrides,
            flags: generate_configs(&env, &device),
            device,
            instances: InstanceCounter::default(),
            page_hidden: false,
            store,
        };
        state.recompute();
        Self {
            inner: Rc::new(RefCell::new(state)),
            listeners: Rc::new(RefCell::new(Listeners::default())),
        }
    }

    /// Snapshot of every category's configuration.
    pub fn flags(&self) -> FeatureFlags {
        self.inner.borrow().flags
    }

    /// Configuration of one category.
    pub fn config(&self, category: Category) -> AnimationGroupConfig {
        *self.inner.borrow().flags.get(category)
    }

    /// Whether `category` may animate.
    pub fn is_enabled(&self, category: Category) -> bool {
        self.config(category).enabled
    }

    /// Quality tier for `category`.
    pub fn quality(&self, category: Category) -> Quality {
        self.config(category).quality
    }

    /// Whether `category` instances wait for viewport intersection.
    pub fn should_lazy_load(&self, category: Category) -> bool {
        self.config(category).lazy_load
    }

    /// Whether a new `category` instance would be admitted right now.
    pub fn can_create_instance(&self, category: Category) -> bool {
        let st = self.inner.borrow();
        st.instances.can_admit(category, &st.flags)
    }

    /// Count a new live instance. Returns `false`, without counting, when not admitted.
    pub fn register_instance(&self, category: Category) -> bool {
        let mut guard = self.inner.borrow_mut();
        let st = &mut *guard;
        st.instances.register(category, &st.flags)
    }

    /// Release a live instance. Extra releases are ignored.
    pub fn unregister_instance(&self, category: Category) {
        self.inner.borrow_mut().instances.unregister(category);
    }

    /// Live instances of `category`.
    pub fn instance_count(&self, category: Category) -> usize {
        self.inner.borrow().instances.count(category)
    }

    /// [`register_instance`](Self::register_instance) returning a guard that unregisters on
    /// drop.
    pub fn try_admit(&self, category: Category) -> Option<Admission> {
        self.register_instance(category).then(|| Admission {
            governor: self.clone(),
            category,
        })
    }

    /// Replace whole category configs and notify listeners.
    ///
    /// Patched values last until the next recomputation. While the page is hidden every
    /// category stays disabled.
    pub fn update_flags(&self, patch: &FlagsPatch) {
        let snapshot = {
            let mut st = self.inner.borrow_mut();
            st.flags.apply(patch);
            if st.page_hidden {
                st.flags = st.flags.all_disabled();
            }
            st.flags
        };
        self.notify(snapshot);
    }

    /// Merge into the override layer, re-derive from the unchanged device snapshot, persist,
    /// and notify listeners.
    pub fn set_environment_overrides(&self, partial: &EnvironmentOverrides) {
        let snapshot = {
            let mut st = self.inner.borrow_mut();
            st.overrides.merge(partial);
            if let Some(store) = st.store.clone()
                && let Err(e) = st.overrides.save(store.as_ref())
            {
                tracing::warn!(error = %e, "could not persist animation flag overrides");
            }
            st.recompute()
        };
        self.notify(snapshot);
    }

    /// Feed a `prefers-reduced-motion` media-query change.
    pub fn set_reduced_motion(&self, reduce: bool) {
        let snapshot = {
            let mut st = self.inner.borrow_mut();
            if st.device.reduced_motion == reduce {
                return;
            }
            st.device.reduced_motion = reduce;
            st.recompute()
        };
        self.notify(snapshot);
    }

    /// Feed a page-visibility change. Hidden disables every category; visible re-derives.
    pub fn set_page_visible(&self, visible: bool) {
        let snapshot = {
            let mut st = self.inner.borrow_mut();
            if st.page_hidden == !visible {
                return;
            }
            st.page_hidden = !visible;
            st.recompute()
        };
        self.notify(snapshot);
    }

    /// Register a listener called with the new snapshot after every recomputation.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&FeatureFlags) + 'static,
    {
        let mut l = self.listeners.borrow_mut();
        let id = SubscriptionId(l.next_id);
        l.next_id += 1;
        l.live.insert(id);
        l.entries.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut l = self.listeners.borrow_mut();
        if !l.live.remove(&id) {
            return false;
        }
        l.entries.retain(|(i, _)| *i != id);
        true
    }

    /// Full internal state.
    pub fn debug_info(&self) -> DebugInfo {
        let st = self.inner.borrow();
        DebugInfo {
            flags: st.flags,
            environment: st.environment(),
            overrides: st.overrides,
            device: st.device.clone(),
            instance_counts: st.instances.snapshot(),
            page_hidden: st.page_hidden,
            subscribers: self.listeners.borrow().live.len(),
        }
    }

    // Listeners are moved out while they run so they may subscribe, unsubscribe or trigger
    // another recomputation; a nested recomputation is delivered after the current round.
    fn notify(&self, snapshot: FeatureFlags) {
        {
            let mut l = self.listeners.borrow_mut();
            if l.dispatching {
                l.pending = Some(snapshot);
                return;
            }
            l.dispatching = true;
        }

        let mut next = Some(snapshot);
        while let Some(flags) = next.take() {
            let mut active = std::mem::take(&mut self.listeners.borrow_mut().entries);
            for (id, listener) in active.iter_mut() {
                if !self.listeners.borrow().live.contains(id) {
                    continue;
                }
                listener(&flags);
            }

            let mut l = self.listeners.borrow_mut();
            let added = std::mem::take(&mut l.entries);
            active.extend(added);
            active.retain(|(id, _)| l.live.contains(id));
            l.entries = active;
            next = l.pending.take();
        }

        self.listeners.borrow_mut().dispatching = false;
    }
}

/// A counted live instance; unregisters itself when dropped.
pub struct Admission {
    governor: FlagGovernor,
    category: Category,
}

impl Admission {
    /// Category this instance counts against.
    pub fn category(&self) -> Category {
        self.category
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.governor.unregister_instance(self.category);
    }
}

impl std::fmt::Debug for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admission")
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/flags/governor.rs"]
mod tests;
