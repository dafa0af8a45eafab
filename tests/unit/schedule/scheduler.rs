use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::env::clock::ManualClock;

type Log = Rc<RefCell<Vec<String>>>;

fn setup() -> (FrameScheduler, ManualClock, Log) {
    setup_with(SchedulerConfig::default())
}

fn setup_with(config: SchedulerConfig) -> (FrameScheduler, ManualClock, Log) {
    let clock = ManualClock::new(0.0);
    let sched = FrameScheduler::new(config, Rc::new(clock.clone()));
    (sched, clock, Rc::new(RefCell::new(Vec::new())))
}

// Work that logs its name and burns `cost_ms` of manual-clock time.
fn work(
    log: &Log,
    clock: &ManualClock,
    name: &str,
    cost_ms: f64,
) -> impl FnOnce() -> anyhow::Result<()> + 'static {
    let log = log.clone();
    let clock = clock.clone();
    let name = name.to_string();
    move || {
        clock.advance(cost_ms);
        log.borrow_mut().push(name);
        Ok(())
    }
}

fn tick(sched: &FrameScheduler, clock: &ManualClock) -> FrameReport {
    sched.on_frame(clock.now_ms())
}

#[test]
fn higher_priority_runs_first() {
    let (s, c, log) = setup();
    s.schedule("a", work(&log, &c, "a", 0.5), TaskOptions::new(Priority::Low));
    s.schedule("b", work(&log, &c, "b", 0.5), TaskOptions::new(Priority::Critical));
    s.schedule("c", work(&log, &c, "c", 0.5), TaskOptions::new(Priority::Medium));

    let r = tick(&s, &c);
    assert_eq!(r.executed, 3);
    assert_eq!(*log.borrow(), vec!["b", "c", "a"]);
}

#[test]
fn equal_priority_keeps_scheduling_order() {
    let (s, c, log) = setup();
    for name in ["one", "two", "three"] {
        s.schedule(name, work(&log, &c, name, 0.1), TaskOptions::new(Priority::High));
    }
    tick(&s, &c);
    assert_eq!(*log.borrow(), vec!["one", "two", "three"]);
}

#[test]
fn nothing_runs_before_the_next_frame() {
    let (s, c, log) = setup();
    s.schedule("a", work(&log, &c, "a", 0.1), TaskOptions::default());
    assert!(log.borrow().is_empty());
    assert_eq!(s.len(), 1);
    tick(&s, &c);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn tasks_scheduled_during_a_frame_wait_for_the_next() {
    let (s, c, log) = setup();
    let inner_sched = s.clone();
    let inner_log = log.clone();
    let inner_clock = c.clone();
    s.schedule(
        "parent",
        move || {
            inner_sched.schedule(
                "child",
                work(&inner_log, &inner_clock, "child", 0.1),
                TaskOptions::new(Priority::Critical),
            );
            Ok(())
        },
        TaskOptions::default(),
    );

    let r = tick(&s, &c);
    assert_eq!(r.executed, 1);
    assert!(log.borrow().is_empty());
    assert!(s.pending("child").is_some());

    c.advance(16.0);
    tick(&s, &c);
    assert_eq!(*log.borrow(), vec!["child"]);
}

#[test]
fn rescheduling_same_id_runs_latest_once() {
    let (s, c, log) = setup();
    s.schedule("x", work(&log, &c, "first", 0.1), TaskOptions::default());
    s.schedule("x", work(&log, &c, "second", 0.1), TaskOptions::default());
    assert_eq!(s.len(), 1);

    tick(&s, &c);
    c.advance(16.0);
    tick(&s, &c);
    assert_eq!(*log.borrow(), vec!["second"]);
    assert_eq!(s.stats().completed_tasks, 1);
}

#[test]
fn cancel_reports_whether_something_was_pending() {
    let (s, c, log) = setup();
    assert!(!s.cancel("ghost"));

    s.schedule("x", work(&log, &c, "x", 0.1), TaskOptions::default());
    assert!(s.cancel("x"));
    assert!(!s.cancel("x"));
    tick(&s, &c);
    assert!(log.borrow().is_empty());

    s.schedule("y", work(&log, &c, "y", 0.1), TaskOptions::default());
    c.advance(16.0);
    tick(&s, &c);
    assert!(!s.cancel("y"));
    assert_eq!(*log.borrow(), vec!["y"]);
}

#[test]
fn frame_budget_limits_tasks_per_frame() {
    let (s, c, log) = setup();
    for i in 0..5 {
        let name = format!("t{i}");
        s.schedule(
            name.clone(),
            work(&log, &c, &name, 5.0),
            TaskOptions::new(Priority::Medium).cost(5.0),
        );
    }

    // 14.67 -> 9.67 -> 4.67, and the third 5ms task no longer fits.
    let r = tick(&s, &c);
    assert_eq!(r.executed, 2);
    assert!(r.deferred);
    assert!(r.spent_ms <= s.config().frame_budget_ms() + 5.0);
    assert_eq!(r.queued, 3);

    c.advance(1.0);
    tick(&s, &c);
    assert_eq!(*log.borrow(), vec!["t0", "t1", "t2", "t3"]);
}

#[test]
fn over_budget_task_is_deferred_but_critical_runs() {
    let (s, c, log) = setup();
    s.schedule(
        "x",
        work(&log, &c, "x", 20.0),
        TaskOptions::new(Priority::Medium).cost(20.0),
    );
    s.schedule(
        "y",
        work(&log, &c, "y", 1.0),
        TaskOptions::new(Priority::Critical).cost(1.0),
    );

    let r = tick(&s, &c);
    assert_eq!(*log.borrow(), vec!["y"]);
    assert!(r.deferred);
    assert!(s.pending("x").is_some());
}

#[test]
fn critical_ignores_cost_estimate_in_a_tight_budget() {
    let (s, c, log) = setup();
    s.schedule(
        "big",
        work(&log, &c, "big", 12.0),
        TaskOptions::new(Priority::Critical).cost(12.0),
    );
    s.schedule(
        "late",
        work(&log, &c, "late", 1.0),
        TaskOptions::new(Priority::Critical).cost(5.0),
    );
    s.schedule(
        "medium",
        work(&log, &c, "medium", 1.0),
        TaskOptions::new(Priority::Medium).cost(5.0),
    );

    let r = tick(&s, &c);
    assert_eq!(*log.borrow(), vec!["big", "late"]);
    assert!(r.deferred);
    assert!(s.pending("medium").is_some());
}

#[test]
fn no_task_starts_once_budget_is_spent() {
    let (s, c, log) = setup();
    s.schedule(
        "hog",
        work(&log, &c, "hog", 14.0),
        TaskOptions::new(Priority::Critical).cost(1.0),
    );
    s.schedule(
        "next",
        work(&log, &c, "next", 0.1),
        TaskOptions::new(Priority::Critical).cost(0.1),
    );

    let r = tick(&s, &c);
    assert_eq!(r.executed, 1);
    assert!(!r.deferred);
    assert!(r.remaining_budget_ms <= 1.0);
    assert!(s.pending("next").is_some());
}

#[test]
fn stale_task_is_retried_then_dropped() {
    let (s, c, log) = setup();
    c.set(1000.0);
    // Never fits a frame, so it can only go stale.
    s.schedule(
        "stuck",
        work(&log, &c, "stuck", 1.0),
        TaskOptions::new(Priority::Medium).cost(50.0).deadline(999.0),
    );

    for expected in 1..=3 {
        let r = tick(&s, &c);
        assert_eq!(r.retried, 1);
        assert_eq!(s.pending("stuck").unwrap().retry_count, expected);
        c.advance(200.0);
    }

    let r = tick(&s, &c);
    assert_eq!(r.expired, 1);
    assert!(s.pending("stuck").is_none());
    assert_eq!(s.stats().completed_tasks, 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn stale_task_with_retries_left_still_runs() {
    let (s, c, log) = setup();
    c.set(500.0);
    s.schedule(
        "late",
        work(&log, &c, "late", 1.0),
        TaskOptions::default().deadline(100.0),
    );
    let r = tick(&s, &c);
    assert_eq!(r.retried, 1);
    assert_eq!(r.executed, 1);
    assert_eq!(*log.borrow(), vec!["late"]);
}

#[test]
fn sweep_drops_expired_tasks_left_in_queue() {
    let config = SchedulerConfig {
        max_retries: 0,
        ..SchedulerConfig::default()
    };
    let (s, c, log) = setup_with(config);
    c.set(100.0);
    s.schedule(
        "blocker",
        work(&log, &c, "blocker", 1.0),
        TaskOptions::new(Priority::High).cost(30.0).deadline(10_000.0),
    );
    s.schedule(
        "stale",
        work(&log, &c, "stale", 1.0),
        TaskOptions::new(Priority::Low).deadline(50.0),
    );

    let r = tick(&s, &c);
    assert!(r.deferred);
    assert_eq!(r.expired, 1);
    assert!(s.pending("stale").is_none());
    assert!(s.pending("blocker").is_some());
}

#[test]
fn failing_task_is_discarded_and_frame_continues() {
    let (s, c, log) = setup();
    s.schedule(
        "bad",
        || Err(anyhow::anyhow!("paint exploded")),
        TaskOptions::new(Priority::Critical),
    );
    s.schedule("good", work(&log, &c, "good", 1.0), TaskOptions::default());

    let r = tick(&s, &c);
    assert_eq!(r.failed, 1);
    assert_eq!(r.executed, 1);
    assert!(s.pending("bad").is_none());
    assert_eq!(s.stats().completed_tasks, 1);
    assert_eq!(*log.borrow(), vec!["good"]);
}

#[test]
fn panicking_task_fails_without_stranding_new_tasks() {
    let (s, c, log) = setup();
    let (inner, inner_log, inner_clock) = (s.clone(), log.clone(), c.clone());
    s.schedule(
        "parent",
        move || {
            inner.schedule(
                "child",
                work(&inner_log, &inner_clock, "child", 0.5),
                TaskOptions::new(Priority::Low),
            );
            Ok(())
        },
        TaskOptions::new(Priority::Critical),
    );
    s.schedule(
        "boom",
        || panic!("layout exploded"),
        TaskOptions::new(Priority::High),
    );

    let r = tick(&s, &c);
    assert_eq!(r.executed, 1);
    assert_eq!(r.failed, 1);
    assert!(s.pending("boom").is_none());
    assert!(s.pending("child").is_some());

    c.advance(16.0);
    let r = tick(&s, &c);
    assert_eq!(r.executed, 1);
    assert_eq!(*log.borrow(), vec!["child"]);
    assert!(s.is_empty());
}

#[test]
fn cost_estimate_follows_moving_average() {
    let (s, c, log) = setup();
    s.schedule(
        "p",
        work(&log, &c, "p", 10.0),
        TaskOptions::default().cost(5.0),
    );
    tick(&s, &c);

    s.schedule("p", work(&log, &c, "p", 10.0), TaskOptions::default());
    let info = s.pending("p").unwrap();
    assert!((info.estimated_cost_ms - 6.0).abs() < 1e-9);
    assert!((s.stats().average_task_cost_ms - 10.0).abs() < 1e-9);

    // An explicit estimate still wins.
    s.schedule("p", work(&log, &c, "p", 10.0), TaskOptions::default().cost(2.0));
    assert_eq!(s.pending("p").unwrap().estimated_cost_ms, 2.0);
}

#[test]
fn frame_stats_track_average_and_drops() {
    let (s, _c, _log) = setup();
    for t in [0.0, 16.0, 32.0, 60.0] {
        s.on_frame(t);
    }
    let st = s.stats();
    assert!((st.average_frame_time_ms - 20.0).abs() < 1e-9);
    assert_eq!(st.dropped_frames, 1);
    assert_eq!(st.total_dropped_frames, 1);
    assert_eq!(st.frame_index, 4);
}

#[test]
fn frame_history_is_bounded() {
    let config = SchedulerConfig {
        history_len: 3,
        ..SchedulerConfig::default()
    };
    let (s, _c, _log) = setup_with(config);
    for t in [0.0, 100.0, 110.0, 120.0, 130.0] {
        s.on_frame(t);
    }
    let st = s.stats();
    assert!((st.average_frame_time_ms - 10.0).abs() < 1e-9);
    assert_eq!(st.dropped_frames, 0);
    assert_eq!(st.total_dropped_frames, 1);
}

#[test]
fn pressure_and_quality_follow_queue_depth() {
    let (s, c, log) = setup();
    assert_eq!(s.recommended_quality(), Quality::High);
    assert!(!s.is_under_pressure());

    for i in 0..4 {
        s.schedule(format!("q{i}"), work(&log, &c, "q", 0.0), TaskOptions::default());
    }
    assert_eq!(s.recommended_quality(), Quality::Medium);

    for i in 4..11 {
        s.schedule(format!("q{i}"), work(&log, &c, "q", 0.0), TaskOptions::default());
    }
    assert_eq!(s.recommended_quality(), Quality::Low);
    assert!(s.is_under_pressure());
}

#[test]
fn slow_frames_signal_pressure() {
    let (s, _c, _log) = setup();
    for i in 0..10 {
        s.on_frame(f64::from(i) * 30.0);
    }
    assert!(s.is_under_pressure());
    assert_eq!(s.recommended_quality(), Quality::Low);
}

#[test]
fn hidden_page_pauses_without_losing_tasks() {
    let (s, c, log) = setup();
    s.on_frame(c.now_ms());
    s.schedule("a", work(&log, &c, "a", 0.1), TaskOptions::default());

    s.set_page_visible(false);
    assert!(s.is_paused());
    c.advance(16.0);
    let r = tick(&s, &c);
    assert!(r.paused);
    assert!(!r.wants_next_frame());
    assert!(log.borrow().is_empty());
    assert_eq!(s.len(), 1);

    c.advance(500.0);
    s.set_page_visible(true);
    let r = tick(&s, &c);
    assert!(!r.paused);
    assert_eq!(*log.borrow(), vec!["a"]);
    assert_eq!(s.stats().total_dropped_frames, 0);
}

#[test]
fn presets_set_priority_and_deadline() {
    let (s, c, log) = setup();
    c.set(100.0);
    s.schedule_critical("now", work(&log, &c, "now", 0.0));
    s.schedule_soon("soon", work(&log, &c, "soon", 0.0));
    s.schedule_background("later", work(&log, &c, "later", 0.0));

    let now = s.pending("now").unwrap();
    assert_eq!(now.priority, Priority::Critical);
    assert!((now.deadline - (100.0 + 1000.0 / 60.0)).abs() < 1e-9);
    let soon = s.pending("soon").unwrap();
    assert_eq!(soon.priority, Priority::High);
    assert_eq!(soon.deadline, 200.0);
    assert_eq!(s.pending("later").unwrap().priority, Priority::Low);

    tick(&s, &c);
    assert_eq!(*log.borrow(), vec!["now", "soon", "later"]);
}

#[test]
fn clear_drops_everything() {
    let (s, c, log) = setup();
    s.schedule("a", work(&log, &c, "a", 0.0), TaskOptions::default());
    s.schedule("b", work(&log, &c, "b", 0.0), TaskOptions::default());
    s.clear();
    assert!(s.is_empty());
    tick(&s, &c);
    assert!(log.borrow().is_empty());
}
