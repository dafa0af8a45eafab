use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::*;
use crate::env::probe::StaticProbe;
use crate::env::store::MemoryStore;
use crate::flags::environment::OVERRIDE_KEY;

fn governor() -> FlagGovernor {
    FlagGovernor::new(EnvironmentFlags::default(), DeviceCapabilities::default())
}

fn counter(g: &FlagGovernor) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    g.subscribe(move |_| h.set(h.get() + 1));
    hits
}

#[test]
fn reads_return_snapshots() {
    let g = governor();
    let mut snap = g.flags();
    snap.micro.enabled = false;
    assert!(g.is_enabled(Category::Micro));
    assert_eq!(g.quality(Category::Hover), Quality::High);
    assert!(g.should_lazy_load(Category::Scroll));
    assert!(!g.should_lazy_load(Category::Micro));
}

#[test]
fn admission_respects_ceiling_and_guard_releases() {
    let g = governor();
    let max = g.config(Category::Complex).max_instances;
    let guards: Vec<_> = (0..max)
        .map(|_| g.try_admit(Category::Complex).expect("admitted"))
        .collect();
    assert!(!g.can_create_instance(Category::Complex));
    assert!(g.try_admit(Category::Complex).is_none());
    assert_eq!(g.instance_count(Category::Complex), max);

    drop(guards);
    assert_eq!(g.instance_count(Category::Complex), 0);
    assert!(g.register_instance(Category::Complex));
    g.unregister_instance(Category::Complex);
    g.unregister_instance(Category::Complex);
    assert_eq!(g.instance_count(Category::Complex), 0);
}

#[test]
fn update_flags_replaces_config_and_notifies() {
    let g = governor();
    let hits = counter(&g);
    let mut cfg = g.config(Category::Hover);
    cfg.enabled = false;
    g.update_flags(&FlagsPatch::single(Category::Hover, cfg));
    assert!(!g.is_enabled(Category::Hover));
    assert!(!g.can_create_instance(Category::Hover));
    assert_eq!(hits.get(), 1);
}

#[test]
fn reduced_motion_disables_everything_and_recovers() {
    let g = governor();
    let hits = counter(&g);
    g.set_reduced_motion(true);
    assert!(Category::ALL.iter().all(|c| !g.is_enabled(*c)));
    g.set_reduced_motion(true);
    assert_eq!(hits.get(), 1);

    g.set_reduced_motion(false);
    assert!(g.is_enabled(Category::Complex));
    assert_eq!(hits.get(), 2);
}

#[test]
fn hidden_page_disables_and_visible_rederives() {
    let g = governor();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    g.subscribe(move |f| s.borrow_mut().push(f.micro.enabled));

    g.set_page_visible(false);
    assert!(!g.is_enabled(Category::Micro));
    assert!(g.debug_info().page_hidden);
    g.set_page_visible(true);
    assert!(g.is_enabled(Category::Micro));
    assert_eq!(*seen.borrow(), vec![false, true]);
}

#[test]
fn overrides_merge_persist_and_reload() {
    let store: Rc<dyn OverrideStore> = Rc::new(MemoryStore::new());
    let g = FlagGovernor::load(EnvironmentFlags::default(), &StaticProbe::default(), store.clone());
    let hits = counter(&g);

    g.set_environment_overrides(&EnvironmentOverrides {
        hover: Some(false),
        ..EnvironmentOverrides::default()
    });
    g.set_environment_overrides(&EnvironmentOverrides {
        scroll: Some(false),
        ..EnvironmentOverrides::default()
    });
    assert!(!g.is_enabled(Category::Hover));
    assert!(!g.is_enabled(Category::Scroll));
    assert!(g.is_enabled(Category::Micro));
    assert_eq!(hits.get(), 2);
    assert!(store.load(OVERRIDE_KEY).unwrap().is_some());

    let reloaded =
        FlagGovernor::load(EnvironmentFlags::default(), &StaticProbe::default(), store);
    assert!(!reloaded.is_enabled(Category::Hover));
    assert!(!reloaded.is_enabled(Category::Scroll));
}

#[test]
fn load_uses_probed_device() {
    let store: Rc<dyn OverrideStore> = Rc::new(MemoryStore::new());
    let probe = StaticProbe::default().cores(2).memory_gb(1.0).hover(false);
    let g = FlagGovernor::load(EnvironmentFlags::default(), &probe, store);
    assert!(!g.is_enabled(Category::Complex));
    assert!(!g.is_enabled(Category::Hover));
    assert_eq!(g.quality(Category::Micro), Quality::Low);
    assert_eq!(g.config(Category::Micro).max_instances, 20);
}

#[test]
fn unsubscribe_stops_delivery() {
    let g = governor();
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    let id = g.subscribe(move |_| h.set(h.get() + 1));
    g.set_reduced_motion(true);
    assert!(g.unsubscribe(id));
    assert!(!g.unsubscribe(id));
    g.set_reduced_motion(false);
    assert_eq!(hits.get(), 1);
}

#[test]
fn listener_may_unsubscribe_itself_during_dispatch() {
    let g = governor();
    let hits = Rc::new(Cell::new(0));
    let slot: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
    let (h, s, handle) = (hits.clone(), slot.clone(), g.clone());
    let id = g.subscribe(move |_| {
        h.set(h.get() + 1);
        if let Some(id) = s.get() {
            handle.unsubscribe(id);
        }
    });
    slot.set(Some(id));

    g.set_reduced_motion(true);
    g.set_reduced_motion(false);
    assert_eq!(hits.get(), 1);
    assert_eq!(g.debug_info().subscribers, 0);
}

#[test]
fn listener_may_trigger_nested_update() {
    let g = governor();
    let handle = g.clone();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    g.subscribe(move |f| {
        s.borrow_mut().push(f.micro.enabled);
        if !f.micro.enabled {
            handle.set_reduced_motion(false);
        }
    });

    g.set_reduced_motion(true);
    assert_eq!(*seen.borrow(), vec![false, true]);
    assert!(g.is_enabled(Category::Micro));
}

#[test]
fn debug_info_reports_state() {
    let g = governor();
    let _a = g.try_admit(Category::Hover);
    let info = g.debug_info();
    assert_eq!(info.instance_counts[&Category::Hover], 1);
    assert_eq!(info.flags, g.flags());
    assert!(info.environment.enable_all);

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["instance_counts"]["hover"], 1);
    assert_eq!(json["page_hidden"], false);
}

#[test]
fn patch_cannot_enable_a_category_while_hidden() {
    let g = governor();
    g.set_page_visible(false);

    let cfg = AnimationGroupConfig {
        enabled: true,
        ..g.config(Category::Hover)
    };
    g.update_flags(&FlagsPatch::single(Category::Hover, cfg));
    assert!(!g.is_enabled(Category::Hover));
    assert!(!g.can_create_instance(Category::Hover));
    assert!(g.try_admit(Category::Hover).is_none());

    g.set_page_visible(true);
    assert!(g.is_enabled(Category::Hover));
}
