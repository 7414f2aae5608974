//! Stall detection and the stopped status, deterministic and threaded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tacho_core::mocks::ScriptedInput;
use tacho_core::{
    EncoderConfig, EstimatorCfg, EstimatorState, IntervalLimits, MotionState, MotorStatus,
    RpmEstimator, StallMonitor, StatsAggregator, StatsCfg, Tachometer,
};
use tacho_traits::Clock;
use tacho_traits::test_clock::TestClock;

#[test]
fn idle_past_timeout_reports_exact_zero_and_stopped() {
    let enc = EncoderConfig::new(1000, 0.0, 3000.0).unwrap();
    let cfg = EstimatorCfg::default();
    let mut st = EstimatorState::from_cfg(&cfg);
    let limits = IntervalLimits::new(&enc, cfg.stall_timeout);
    let mut est = RpmEstimator::new(&enc, &cfg);
    let mon = StallMonitor::new(cfg.stall_timeout);
    let stats = StatsAggregator::new(enc, StatsCfg::default());

    let mut t = Instant::now();
    for _ in 0..5 {
        for _ in 0..10 {
            t += Duration::from_micros(100); // 600 RPM
            st.record_pulse(t, &limits);
        }
        est.tick(&mut st, t);
    }
    assert!((st.current_rpm() - 600.0).abs() < 1e-6);
    assert_eq!(stats.compute(&st).status, MotorStatus::Normal);

    assert!(!mon.check(&mut st, t + Duration::from_millis(1900)));
    assert!(mon.check(&mut st, t + Duration::from_millis(2100)));
    assert_eq!(st.current_rpm(), 0.0);
    assert!(st.intervals().is_empty());
    assert_eq!(st.motion(), MotionState::Stalled);

    let s = stats.compute(&st);
    assert_eq!(s.current_rpm, 0.0);
    assert_eq!(s.status, MotorStatus::Stopped);
    // history survives the stall
    assert_eq!(s.samples, 5);
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn running_tachometer_stalls_when_pulses_stop() {
    let input = ScriptedInput::new();
    let clock = TestClock::new();
    let tacho = Tachometer::builder()
        .with_input(input.clone())
        .with_encoder(EncoderConfig::new(20, 0.0, 3000.0).unwrap())
        .with_estimator(EstimatorCfg {
            period: Duration::from_millis(5),
            stall_check_period: Duration::from_millis(5),
            ..EstimatorCfg::default()
        })
        .with_clock(Arc::new(clock.clone()))
        .try_build()
        .unwrap();
    tacho.start().unwrap();

    // 5 ms at 20 PPR = 600 RPM
    input.fire_train(clock.now(), Duration::from_millis(5), 30);
    clock.advance(Duration::from_millis(150));
    assert!(wait_until(|| tacho.current_rpm() > 0.0));
    assert!((tacho.current_rpm() - 600.0).abs() < 1.0);
    assert_eq!(tacho.motion(), MotionState::Running);

    clock.advance(Duration::from_secs(3));
    assert!(wait_until(|| tacho.current_rpm() == 0.0));
    assert_eq!(tacho.stats().status, MotorStatus::Stopped);
    assert_eq!(tacho.motion(), MotionState::Stalled);

    tacho.stop();
}
