#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation must never panic. A config that validates must
    // also be accepted by the core's own encoder checks.
    let Ok(cfg) = tacho_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let encoder = tacho_core::EncoderConfig::try_from(&cfg.encoder);
    assert!(encoder.is_ok(), "validated encoder rejected by core: {encoder:?}");
    let estimator: tacho_core::EstimatorCfg = (&cfg.estimator).into();
    assert!(estimator.window <= estimator.interval_capacity);
});
