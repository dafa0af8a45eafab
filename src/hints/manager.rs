use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::{Rc, Weak};

use crate::env::clock::Clock;
use crate::foundation::core::Millis;
use crate::hints::property::{HintPriority, HintProperty, format_hint};

/// An element that can carry a `will-change` hint.
///
/// The manager is the only writer of the hint; callers go through [`HintManager`] instead of
/// touching it directly.
pub trait HintTarget {
    /// Replace the element's hint with `value` (never empty).
    fn set_hint(&self, value: &str);

    /// Remove the element's hint.
    fn clear_hint(&self);

    /// Whether the element is still attached to the document.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Pool limits and cleanup cadence.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HintManagerConfig {
    /// Maximum concurrently hinted elements.
    pub max_elements: usize,
    /// Interval between background sweeps.
    pub sweep_interval_ms: Millis,
    /// Registrations untouched for longer than this are swept.
    pub max_age_ms: Millis,
}

impl Default for HintManagerConfig {
    fn default() -> Self {
        Self {
            max_elements: 50,
            sweep_interval_ms: 30_000.0,
            max_age_ms: 60_000.0,
        }
    }
}

/// Arguments to [`HintManager::add`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HintOptions {
    /// Properties to union into the element's hint.
    pub properties: Vec<HintProperty>,
    /// Remove these properties again after this long; other properties keep their own timers.
    pub duration_ms: Option<Millis>,
    /// Eviction weight.
    pub priority: HintPriority,
}

impl HintOptions {
    /// Options hinting `properties` at default priority with no auto-removal.
    pub fn new<I, P>(properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<HintProperty>,
    {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Auto-remove after `ms`.
    pub fn duration(mut self, ms: Millis) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Set the eviction weight.
    pub fn priority(mut self, priority: HintPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Snapshot of the managed pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct HintStats {
    /// Registered elements.
    pub element_count: usize,
    /// Sum of hinted properties over all elements.
    pub total_properties: usize,
    /// Age of the oldest registration.
    pub oldest_age_ms: Millis,
    /// Mean registration age.
    pub average_age_ms: Millis,
}

/// What one [`HintManager::poll`] call removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HintPollReport {
    /// Timed auto-removals that fired.
    pub expired: usize,
    /// Registrations dropped by the background sweep.
    pub swept: usize,
}

/// Reference-tracked gatekeeper for `will-change` hints.
///
/// Registrations are keyed by element identity and hold only weak references, so a dropped
/// element is treated as detached and reclaimed by the next sweep.
#[derive(Clone)]
pub struct HintManager {
    inner: Rc<RefCell<HintState>>,
}

type ElementKey = usize;

struct Registration {
    target: Weak<dyn HintTarget>,
    properties: BTreeSet<HintProperty>,
    priority: HintPriority,
    created_at: Millis,
    last_touched: Millis,
    // Pending auto-removal time per property.
    expiries: BTreeMap<HintProperty, Millis>,
}

struct HintState {
    config: HintManagerConfig,
    clock: Rc<dyn Clock>,
    regs: HashMap<ElementKey, Registration>,
    next_sweep_at: Millis,
}

// Target writes are applied after the state borrow is released.
enum Paint {
    Set(Weak<dyn HintTarget>, String),
    Clear(Weak<dyn HintTarget>),
}

fn element_key<E: ?Sized>(element: &Rc<E>) -> ElementKey {
    Rc::as_ptr(element) as *const () as usize
}

fn apply(paints: Vec<Paint>) {
    for paint in paints {
        match paint {
            Paint::Set(target, value) => {
                if let Some(t) = target.upgrade() {
                    t.set_hint(&value);
                }
            }
            Paint::Clear(target) => {
                if let Some(t) = target.upgrade() {
                    t.clear_hint();
                }
            }
        }
    }
}

impl HintManager {
    /// Create a manager reading time from `clock`.
    pub fn new(config: HintManagerConfig, clock: Rc<dyn Clock>) -> Self {
        let next_sweep_at = clock.now_ms() + config.sweep_interval_ms;
        Self {
            inner: Rc::new(RefCell::new(HintState {
                config,
                clock,
                regs: HashMap::new(),
                next_sweep_at,
            })),
        }
    }

    /// Union `opts.properties` into the element's hint and apply it.
    ///
    /// With a duration, those properties are removed again once it elapses. Each property
    /// keeps its own removal time: a later timed call reschedules only the properties it
    /// names. Blank custom properties are ignored.
    pub fn add<E: HintTarget + 'static>(&self, element: &Rc<E>, opts: HintOptions) {
        let key = element_key(element);
        let target: Rc<dyn HintTarget> = element.clone();
        let paints = self
            .inner
            .borrow_mut()
            .add(key, Rc::downgrade(&target), opts);
        apply(paints);
    }

    /// Remove `properties` (all when `None`) from the element's hint.
    pub fn remove<E: HintTarget + 'static>(
        &self,
        element: &Rc<E>,
        properties: Option<&[HintProperty]>,
    ) {
        let paints = self
            .inner
            .borrow_mut()
            .remove(element_key(element), properties);
        apply(paints);
    }

    /// Remove every hint from the element.
    pub fn clear<E: HintTarget + 'static>(&self, element: &Rc<E>) {
        self.remove(element, None);
    }

    /// Hint `transform`.
    pub fn prepare_transform<E: HintTarget + 'static>(
        &self,
        element: &Rc<E>,
        duration_ms: Option<Millis>,
    ) {
        self.add_group(element, &[HintProperty::Transform], duration_ms);
    }

    /// Hint `opacity`.
    pub fn prepare_fade<E: HintTarget + 'static>(
        &self,
        element: &Rc<E>,
        duration_ms: Option<Millis>,
    ) {
        self.add_group(element, &[HintProperty::Opacity], duration_ms);
    }

    /// Hint `transform` and `opacity`.
    pub fn prepare_complex<E: HintTarget + 'static>(
        &self,
        element: &Rc<E>,
        duration_ms: Option<Millis>,
    ) {
        self.add_group(
            element,
            &[HintProperty::Transform, HintProperty::Opacity],
            duration_ms,
        );
    }

    /// Hint `contents` for layout containment.
    pub fn prepare_layout<E: HintTarget + 'static>(
        &self,
        element: &Rc<E>,
        duration_ms: Option<Millis>,
    ) {
        self.add_group(element, &[HintProperty::Contents], duration_ms);
    }

    /// Hint `scroll-position` and `transform` for scroll-linked motion.
    pub fn prepare_parallax<E: HintTarget + 'static>(
        &self,
        element: &Rc<E>,
        duration_ms: Option<Millis>,
    ) {
        self.add_group(
            element,
            &[HintProperty::ScrollPosition, HintProperty::Transform],
            duration_ms,
        );
    }

    /// Alias of [`clear`](Self::clear) for effect teardown.
    pub fn cleanup<E: HintTarget + 'static>(&self, element: &Rc<E>) {
        self.clear(element);
    }

    fn add_group<E: HintTarget + 'static>(
        &self,
        element: &Rc<E>,
        properties: &[HintProperty],
        duration_ms: Option<Millis>,
    ) {
        let opts = HintOptions {
            properties: properties.to_vec(),
            duration_ms,
            priority: HintPriority::default(),
        };
        self.add(element, opts);
    }

    /// `true` when the element currently carries a managed hint.
    pub fn has_hint<E: ?Sized>(&self, element: &Rc<E>) -> bool {
        self.inner.borrow().regs.contains_key(&element_key(element))
    }

    /// Properties currently hinted on the element, in hint order.
    pub fn properties<E: ?Sized>(&self, element: &Rc<E>) -> Vec<HintProperty> {
        self.inner
            .borrow()
            .regs
            .get(&element_key(element))
            .map(|r| r.properties.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered elements.
    pub fn len(&self) -> usize {
        self.inner.borrow().regs.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire due auto-removals and, when its interval has elapsed, run the background sweep.
    pub fn poll(&self, now: Millis) -> HintPollReport {
        let (report, paints) = self.inner.borrow_mut().poll(now);
        apply(paints);
        report
    }

    /// Drop every registration when the page is hidden; hints are useless while not rendering.
    pub fn set_page_visible(&self, visible: bool) {
        if !visible {
            self.clear_all();
        }
    }

    /// Drop every registration and clear every hint.
    pub fn clear_all(&self) {
        let paints = self.inner.borrow_mut().clear_all();
        apply(paints);
    }

    /// Pool statistics at the clock's current time.
    pub fn stats(&self) -> HintStats {
        let st = self.inner.borrow();
        st.stats(st.clock.now_ms())
    }
}

impl HintState {
    fn add(
        &mut self,
        key: ElementKey,
        target: Weak<dyn HintTarget>,
        opts: HintOptions,
    ) -> Vec<Paint> {
        let now = self.clock.now_ms();
        let properties: Vec<HintProperty> = opts
            .properties
            .into_iter()
            .filter(|p| !p.is_blank())
            .collect();
        if properties.is_empty() && !self.regs.contains_key(&key) {
            return Vec::new();
        }

        let reg = self.regs.entry(key).or_insert_with(|| Registration {
            target,
            properties: BTreeSet::new(),
            priority: opts.priority,
            created_at: now,
            last_touched: now,
            expiries: BTreeMap::new(),
        });
        reg.properties.extend(properties.iter().cloned());
        reg.priority = reg.priority.max(opts.priority);
        reg.last_touched = now;
        if let Some(d) = opts.duration_ms {
            let at = now + d.max(0.0);
            // A timed call without properties times out everything currently hinted.
            let timed = if properties.is_empty() {
                reg.properties.iter().cloned().collect()
            } else {
                properties
            };
            for p in timed {
                reg.expiries.insert(p, at);
            }
        }

        let mut paints = vec![Paint::Set(reg.target.clone(), format_hint(&reg.properties))];
        paints.extend(self.enforce_cap());
        paints
    }

    fn remove(&mut self, key: ElementKey, properties: Option<&[HintProperty]>) -> Vec<Paint> {
        let Some(reg) = self.regs.get_mut(&key) else {
            return Vec::new();
        };
        if let Some(props) = properties {
            let before = reg.properties.len();
            for p in props {
                reg.properties.remove(p);
                reg.expiries.remove(p);
            }
            if !reg.properties.is_empty() {
                if reg.properties.len() == before {
                    return Vec::new();
                }
                return vec![Paint::Set(reg.target.clone(), format_hint(&reg.properties))];
            }
        }
        match self.regs.remove(&key) {
            Some(reg) => vec![Paint::Clear(reg.target)],
            None => Vec::new(),
        }
    }

    fn enforce_cap(&mut self) -> Vec<Paint> {
        let max = self.config.max_elements;
        if self.regs.len() <= max {
            return Vec::new();
        }

        let mut order: Vec<(u8, Millis, ElementKey)> = self
            .regs
            .iter()
            .map(|(k, r)| (r.priority.weight(), r.created_at, *k))
            .collect();
        order.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let excess = self.regs.len() - max;
        let mut paints = Vec::with_capacity(excess);
        for (_, _, key) in order.into_iter().take(excess) {
            if let Some(reg) = self.regs.remove(&key) {
                paints.push(Paint::Clear(reg.target));
            }
        }
        tracing::debug!(
            evicted = excess,
            limit = max,
            "evicted will-change hints over cap"
        );
        paints
    }

    fn poll(&mut self, now: Millis) -> (HintPollReport, Vec<Paint>) {
        let mut report = HintPollReport::default();
        let mut paints = Vec::new();

        let mut due: Vec<(ElementKey, Vec<HintProperty>)> = Vec::new();
        for (key, reg) in self.regs.iter_mut() {
            let fired: Vec<HintProperty> = reg
                .expiries
                .iter()
                .filter(|(_, at)| **at <= now)
                .map(|(p, _)| p.clone())
                .collect();
            if fired.is_empty() {
                continue;
            }
            for p in &fired {
                reg.expiries.remove(p);
            }
            due.push((*key, fired));
        }
        for (key, props) in due {
            paints.extend(self.remove(key, Some(&props)));
            report.expired += 1;
        }

        if now >= self.next_sweep_at {
            report.swept = self.sweep(now, &mut paints);
            self.next_sweep_at = now + self.config.sweep_interval_ms;
        }
        (report, paints)
    }

    fn sweep(&mut self, now: Millis, paints: &mut Vec<Paint>) -> usize {
        let max_age = self.config.max_age_ms;
        let stale: Vec<ElementKey> = self
            .regs
            .iter()
            .filter(|(_, r)| {
                let attached = r.target.upgrade().is_some_and(|t| t.is_connected());
                !attached || now - r.last_touched > max_age
            })
            .map(|(k, _)| *k)
            .collect();
        for key in &stale {
            if let Some(reg) = self.regs.remove(key) {
                paints.push(Paint::Clear(reg.target));
            }
        }
        if !stale.is_empty() {
            tracing::debug!(
                swept = stale.len(),
                remaining = self.regs.len(),
                "swept stale will-change hints"
            );
        }
        stale.len()
    }

    fn clear_all(&mut self) -> Vec<Paint> {
        self.regs
            .drain()
            .map(|(_, reg)| Paint::Clear(reg.target))
            .collect()
    }

    fn stats(&self, now: Millis) -> HintStats {
        if self.regs.is_empty() {
            return HintStats::default();
        }
        let ages: Vec<Millis> = self
            .regs
            .values()
            .map(|r| (now - r.created_at).max(0.0))
            .collect();
        HintStats {
            element_count: self.regs.len(),
            total_properties: self.regs.values().map(|r| r.properties.len()).sum(),
            oldest_age_ms: ages.iter().copied().fold(0.0, f64::max),
            average_age_ms: ages.iter().sum::<Millis>() / ages.len() as Millis,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/hints/manager.rs"]
mod tests;
