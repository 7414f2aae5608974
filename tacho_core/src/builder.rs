//! Builder for `Tachometer`.
//!
//! Everything except the input and the encoder has a default; `try_build`
//! validates the combination and reports the first missing or invalid piece.

use std::sync::Arc;

use tacho_traits::{Clock, EdgeInput, MonotonicClock, Pull};

use crate::config::{EncoderConfig, EstimatorCfg, StatsCfg};
use crate::error::BuildError;
use crate::state::{EstimatorState, SharedState};
use crate::stats::StatsAggregator;
use crate::tachometer::Tachometer;

/// Default BOARD pin of the reference wiring.
pub const DEFAULT_PIN: u8 = 7;

pub struct TachometerBuilder<I> {
    input: Option<I>,
    encoder: Option<EncoderConfig>,
    estimator: Option<EstimatorCfg>,
    stats: Option<StatsCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    pin: u8,
    pull: Pull,
}

impl<I> Default for TachometerBuilder<I> {
    fn default() -> Self {
        Self {
            input: None,
            encoder: None,
            estimator: None,
            stats: None,
            clock: None,
            pin: DEFAULT_PIN,
            pull: Pull::default(),
        }
    }
}

impl<I: EdgeInput + Send + 'static> TachometerBuilder<I> {
    pub fn with_input(mut self, input: I) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_estimator(mut self, estimator: EstimatorCfg) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn with_stats(mut self, stats: StatsCfg) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Inject a custom clock (e.g. a test clock). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn pin(mut self, pin: u8) -> Self {
        self.pin = pin;
        self
    }

    pub fn pull(mut self, pull: Pull) -> Self {
        self.pull = pull;
        self
    }

    pub fn try_build(self) -> Result<Tachometer<I>, BuildError> {
        let input = self.input.ok_or(BuildError::MissingInput)?;
        let encoder = self.encoder.ok_or(BuildError::MissingEncoder)?;
        let estimator = self.estimator.unwrap_or_default();
        estimator.check().map_err(BuildError::InvalidConfig)?;
        let stats = self.stats.unwrap_or_default();
        if stats.window == 0 {
            return Err(BuildError::InvalidConfig("stats window must be >= 1"));
        }
        if !(stats.high_speed_ratio > 0.0 && stats.high_speed_ratio <= 1.0) {
            return Err(BuildError::InvalidConfig("high_speed_ratio must be in (0, 1]"));
        }

        let shared = SharedState::new(EstimatorState::from_cfg(&estimator));
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(Tachometer::from_parts(
            input,
            encoder,
            estimator,
            StatsAggregator::new(encoder, stats),
            self.pin,
            self.pull,
            clock,
            shared,
        ))
    }
}
