use std::cell::RefCell;
use std::rc::Rc;

use frame_telemetry::{
    ManualClock, PerformanceReport, PerformanceSampler, ResourceSampler, SamplerConfig,
    SamplerState,
};

#[test]
fn live_probe_reports_real_memory_total() {
    let snapshot = ResourceSampler::new().sample();
    assert!(snapshot.cpu_percent >= 0.0);
    assert!(snapshot.memory_total_bytes > 0);
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    assert!(snapshot.memory_used_bytes > 0);
}

#[test]
fn shorter_window_and_warm_up_from_config() {
    let config = SamplerConfig {
        warm_up_secs: 0.5,
        window_secs: 0.25,
    };
    let clock = ManualClock::new(100.0);
    let reports: Rc<RefCell<Vec<PerformanceReport>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reports);
    let mut sampler = PerformanceSampler::with_parts(
        config,
        clock.clone(),
        ResourceSampler::new(),
        move |report: PerformanceReport| sink.borrow_mut().push(report),
    );
    sampler.start();

    for i in 0..=40 {
        let t = 100.0 + i as f64 * 0.0625;
        clock.set(t);
        sampler.on_tick(t);
    }

    assert_eq!(sampler.state(), SamplerState::Active);
    // warm-up completes at 100.5 (tick 8), reports from tick 9 through 40
    let reports = reports.borrow();
    assert_eq!(reports.len(), 32);
    // 0.25s window at 16 ticks/s holds 5 ticks
    assert!(reports.iter().all(|r| r.fps == 5));
    assert!(reports.iter().all(|r| r.memory.total > 0));
}

#[test]
fn report_serializes_for_external_consumers() {
    let clock = ManualClock::new(0.0);
    let last: Rc<RefCell<Option<PerformanceReport>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&last);
    let mut sampler = PerformanceSampler::with_parts(
        SamplerConfig::default(),
        clock.clone(),
        ResourceSampler::new(),
        move |report: PerformanceReport| *sink.borrow_mut() = Some(report),
    );
    sampler.start();
    for t in [1.0, 1.5] {
        clock.set(t);
        sampler.on_tick(t);
    }

    let report = last.borrow().clone().expect("one report");
    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["fps"], 2);
    assert!(json["memory"]["total"].as_u64().unwrap_or(0) > 0);
    assert!(json["captured_at"].is_string());
}
