use std::time::{Duration, Instant};

use rstest::rstest;
use tacho_hardware::util::{Debouncer, pulse_period};

#[rstest]
fn debouncer_drops_edges_inside_gap() {
    let t0 = Instant::now();
    let mut d = Debouncer::new(Duration::from_millis(2));
    assert!(d.accept(t0));
    assert!(!d.accept(t0 + Duration::from_micros(500)));
    assert!(!d.accept(t0 + Duration::from_micros(1999)));
    assert!(d.accept(t0 + Duration::from_millis(2)));
    // Gap is measured from the last accepted edge, not the last seen one.
    assert!(!d.accept(t0 + Duration::from_millis(3)));
    assert!(d.accept(t0 + Duration::from_millis(4)));
}

#[rstest]
#[case(600.0, 10, Some(Duration::from_millis(10)))]
#[case(6.0, 1000, Some(Duration::from_millis(10)))]
#[case(0.0, 1000, None)]
#[case(-5.0, 1000, None)]
fn pulse_period_matches_speed(
    #[case] rpm: f64,
    #[case] ppr: u32,
    #[case] expected: Option<Duration>,
) {
    let got = pulse_period(rpm, ppr);
    match (got, expected) {
        (Some(g), Some(e)) => {
            let diff = g.as_secs_f64() - e.as_secs_f64();
            assert!(diff.abs() < 1e-9, "got {g:?}, expected {e:?}");
        }
        (None, None) => {}
        other => panic!("mismatch: {other:?}"),
    }
}
