use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pin {0} is not configured as an input")]
    NotConfigured(u8),
    #[error("pin {0} already has an edge callback")]
    CallbackBusy(u8),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
