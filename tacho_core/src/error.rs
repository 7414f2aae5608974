use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TachoError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),
    #[error("calibration failed: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("known rpm must be > 0, got {0}")]
    InvalidKnownRpm(f64),
    #[error("calibration duration must be > 0 s, got {0}")]
    InvalidDuration(f64),
    #[error("no pulses counted during the calibration window")]
    NoPulses,
    #[error("calibration already in progress")]
    Busy,
    #[error("hardware error: {0}")]
    Hardware(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing edge input")]
    MissingInput,
    #[error("missing encoder config")]
    MissingEncoder,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = std::result::Result<T, TachoError>;
