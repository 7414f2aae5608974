use std::time::{Duration, Instant};

/// Time source for pulse timestamps, worker ticks and calibration windows.
///
/// Implementations must be monotonic. `sleep` may be simulated.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Seconds elapsed since `start`; 0 if `start` lies in the future.
    fn elapsed_s(&self, start: Instant) -> f64 {
        self.now().saturating_duration_since(start).as_secs_f64()
    }
}

/// Wall-independent system clock backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::{Clock, Duration, Instant};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Manually driven clock. `sleep` returns immediately after moving time
    /// forward, so calibration windows and stall timeouts cost nothing in tests.
    ///
    /// Clones share the same time line.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset_ns: Arc<AtomicU64>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset_ns: Arc::new(AtomicU64::new(0)),
            }
        }

        /// Time zero of this clock.
        pub fn origin(&self) -> Instant {
            self.origin
        }

        pub fn advance(&self, d: Duration) {
            let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
            self.offset_ns
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                    Some(cur.saturating_add(ns))
                })
                .ok();
        }

        /// Jump to `origin + d`. Moving backwards is allowed; `Instant`
        /// arithmetic downstream saturates.
        pub fn set_offset(&self, d: Duration) {
            let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
            self.offset_ns.store(ns, Ordering::Release);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + Duration::from_nanos(self.offset_ns.load(Ordering::Acquire))
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn sleeping_moves_time_without_blocking() {
        let clock = TestClock::new();
        let t0 = clock.now();
        let wall = Instant::now();
        clock.sleep(Duration::from_secs(3));
        assert_eq!(clock.now() - t0, Duration::from_secs(3));
        assert_eq!(clock.elapsed_s(t0), 3.0);
        assert!(wall.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn clones_share_time() {
        let a = TestClock::new();
        let b = a.clone();
        a.advance(Duration::from_millis(250));
        assert_eq!(b.now() - b.origin(), Duration::from_millis(250));
    }

    #[test]
    fn elapsed_is_zero_for_future_start() {
        let clock = TestClock::new();
        let later = clock.now() + Duration::from_millis(50);
        assert_eq!(clock.elapsed_s(later), 0.0);
        clock.set_offset(Duration::from_millis(80));
        assert!((clock.elapsed_s(later) - 0.03).abs() < 1e-9);
    }
}
