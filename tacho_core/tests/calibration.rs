//! Calibration against scripted pulse bursts.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rstest::rstest;
use tacho_core::mocks::ScriptedInput;
use tacho_core::{CalibrationError, EncoderConfig, Tachometer};
use tacho_traits::Clock;
use tacho_traits::test_clock::TestClock;

/// Clock whose `sleep` fails, to abort a calibration mid-window.
struct FailingSleep(TestClock);

impl Clock for FailingSleep {
    fn now(&self) -> Instant {
        self.0.now()
    }

    fn sleep(&self, _d: Duration) {
        panic!("clock failure");
    }
}

fn tacho(input: &ScriptedInput, clock: &TestClock) -> Tachometer<ScriptedInput> {
    Tachometer::builder()
        .with_input(input.clone())
        .with_encoder(EncoderConfig::new(1000, 0.0, 3000.0).unwrap())
        .with_clock(Arc::new(clock.clone()))
        .try_build()
        .unwrap()
}

#[test]
fn five_hundred_pulses_in_three_seconds_at_100_rpm_is_100_ppr() {
    let input = ScriptedInput::new();
    let clock = TestClock::new();
    let t = tacho(&input, &clock);

    input.queue_burst(500);
    let r = t.calibrate(100.0, 3.0).unwrap();
    assert_eq!(r.pulse_count, 500);
    assert!((r.elapsed_s - 3.0).abs() < 1e-9);
    assert!((r.measured_ppr - 100.0).abs() < 1e-9);
    assert_eq!(r.configured_ppr, 1000);

    // pin was claimed only for the calibration window
    assert!(!input.has_callback(7));
    assert!(!input.is_configured(7));
    assert_eq!(input.releases(), 1);
    assert_eq!(input.last_debounce(), Some(Duration::from_millis(1)));
}

#[test]
fn calibration_while_running_restores_capture() {
    let input = ScriptedInput::new();
    let clock = TestClock::new();
    let t = tacho(&input, &clock);
    t.start().unwrap();
    assert_eq!(input.registrations(), 1);

    input.queue_burst(250);
    let r = t.calibrate(50.0, 2.0).unwrap();
    assert!((r.measured_ppr - 150.0).abs() < 1e-9);

    // capture, counter, capture again
    assert_eq!(input.registrations(), 3);
    assert!(input.has_callback(7));
    assert_eq!(input.last_debounce(), Some(t.encoder().bounce()));
    assert!(!t.is_calibrating());
    assert!(t.is_running());
    assert_eq!(input.releases(), 0);

    t.stop();
    assert_eq!(input.releases(), 1);
}

#[test]
fn no_pulses_fails_and_still_restores() {
    let input = ScriptedInput::new();
    let clock = TestClock::new();
    let t = tacho(&input, &clock);
    t.start().unwrap();

    assert_eq!(t.calibrate(100.0, 1.0), Err(CalibrationError::NoPulses));
    assert!(input.has_callback(7));
    assert!(!t.is_calibrating());
    t.stop();
}

#[rstest]
#[case(0.0, 1.0)]
#[case(-10.0, 1.0)]
#[case(f64::NAN, 1.0)]
#[case(100.0, 0.0)]
#[case(100.0, -1.0)]
fn invalid_requests_never_touch_the_input(#[case] known_rpm: f64, #[case] duration_s: f64) {
    let input = ScriptedInput::new();
    let clock = TestClock::new();
    let t = tacho(&input, &clock);
    let err = t.calibrate(known_rpm, duration_s).unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::InvalidKnownRpm(_) | CalibrationError::InvalidDuration(_)
    ));
    assert_eq!(input.registrations(), 0);
}

#[test]
fn unavailable_input_is_a_hardware_error() {
    let t = Tachometer::builder()
        .with_input(ScriptedInput::failing())
        .with_encoder(EncoderConfig::new(1000, 0.0, 3000.0).unwrap())
        .with_clock(Arc::new(TestClock::new()))
        .try_build()
        .unwrap();
    assert!(matches!(t.calibrate(100.0, 1.0), Err(CalibrationError::Hardware(_))));
    assert!(!t.is_calibrating());
}

#[test]
fn concurrent_calibration_fails_fast() {
    let input = ScriptedInput::new();
    // real clock so the first calibration actually occupies the slot
    let t = Arc::new(
        Tachometer::builder()
            .with_input(input.clone())
            .with_encoder(EncoderConfig::new(1000, 0.0, 3000.0).unwrap())
            .try_build()
            .unwrap(),
    );

    let t1 = Arc::clone(&t);
    let first = std::thread::spawn(move || t1.calibrate(100.0, 0.4));
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while !t.is_calibrating() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(t.calibrate(100.0, 0.1), Err(CalibrationError::Busy));
    assert_eq!(first.join().unwrap(), Err(CalibrationError::NoPulses));
}

#[test]
fn duration_beyond_range_is_rejected_without_claiming_the_slot() {
    let input = ScriptedInput::new();
    let clock = TestClock::new();
    let t = tacho(&input, &clock);
    t.start().unwrap();

    assert_eq!(t.calibrate(100.0, 1e20), Err(CalibrationError::InvalidDuration(1e20)));
    assert!(!t.is_calibrating());
    assert_eq!(input.registrations(), 1);

    input.queue_burst(500);
    let r = t.calibrate(100.0, 3.0).unwrap();
    assert!((r.measured_ppr - 100.0).abs() < 1e-9);
    t.stop();
}

#[test]
fn unwinding_out_of_the_window_restores_capture() {
    let input = ScriptedInput::new();
    let t = Tachometer::builder()
        .with_input(input.clone())
        .with_encoder(EncoderConfig::new(1000, 0.0, 3000.0).unwrap())
        .with_clock(Arc::new(FailingSleep(TestClock::new())))
        .try_build()
        .unwrap();
    t.start().unwrap();

    let aborted = catch_unwind(AssertUnwindSafe(|| t.calibrate(100.0, 1.0)));
    assert!(aborted.is_err());

    assert!(!t.is_calibrating());
    // capture, counter, capture again
    assert_eq!(input.registrations(), 3);
    assert!(input.has_callback(7));
    assert_eq!(input.last_debounce(), Some(t.encoder().bounce()));
    t.stop();
    assert_eq!(input.releases(), 1);
}

#[test]
fn unwinding_while_stopped_releases_the_pin() {
    let input = ScriptedInput::new();
    let t = Tachometer::builder()
        .with_input(input.clone())
        .with_encoder(EncoderConfig::new(1000, 0.0, 3000.0).unwrap())
        .with_clock(Arc::new(FailingSleep(TestClock::new())))
        .try_build()
        .unwrap();

    let aborted = catch_unwind(AssertUnwindSafe(|| t.calibrate(100.0, 1.0)));
    assert!(aborted.is_err());
    assert!(!t.is_calibrating());
    assert!(!input.has_callback(7));
    assert!(!input.is_configured(7));
    assert_eq!(input.releases(), 1);
}

#[test]
fn start_during_calibration_is_refused() {
    let input = ScriptedInput::new();
    let t = Arc::new(
        Tachometer::builder()
            .with_input(input.clone())
            .with_encoder(EncoderConfig::new(1000, 0.0, 3000.0).unwrap())
            .try_build()
            .unwrap(),
    );

    let t1 = Arc::clone(&t);
    let calibration = std::thread::spawn(move || t1.calibrate(100.0, 0.4));
    let deadline = Instant::now() + Duration::from_secs(2);
    while !t.is_calibrating() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }

    assert!(t.start().is_err());
    assert!(!t.is_running());
    assert_eq!(calibration.join().unwrap(), Err(CalibrationError::NoPulses));

    // only the counter was ever registered, and the pin went back
    assert_eq!(input.registrations(), 1);
    assert!(!input.has_callback(7));
    assert!(!input.is_configured(7));
}
