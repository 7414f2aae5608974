#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Pulse-train tachometer core (hardware-agnostic).
//!
//! Edges arrive through `tacho_traits::EdgeInput`; everything else here is
//! plain in-memory state and two periodic worker threads.
//!
//! ## Pipeline
//!
//! - **Capture**: edge timestamps become validated intervals (`capture`)
//! - **Estimation**: median of the recent window with IQR trimming (`estimator`)
//! - **Stall detection**: idle timeout forces zero speed (`stall`)
//! - **Read-out**: statistics, snapshots and consumer-side smoothing
//!   (`stats`, `snapshot`, `filter`)
//! - **Calibration**: counts pulses at a known speed to measure PPR (`calibration`)
//!
//! `Tachometer` owns the input and wires these together.

pub mod buffer;
pub mod builder;
pub mod calibration;
pub mod capture;
pub mod config;
pub mod conversions;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod hw_error;
pub mod mocks;
pub mod snapshot;
pub mod stall;
pub mod state;
pub mod stats;
pub mod tachometer;
pub mod util;
pub mod worker;

pub use builder::TachometerBuilder;
pub use calibration::{CalibrationResult, PulseCounter};
pub use capture::{IntervalLimits, PulseCapture};
pub use config::{EncoderConfig, EstimatorCfg, FilterCfg, StatsCfg};
pub use error::{BuildError, CalibrationError, Result, TachoError};
pub use estimator::RpmEstimator;
pub use filter::RpmFilter;
pub use snapshot::Snapshot;
pub use stall::StallMonitor;
pub use state::{EstimatorState, MotionState, SharedState};
pub use stats::{MotorStatus, RpmStats, RpmSummary, StatsAggregator};
pub use tachometer::Tachometer;
