//! Typed views of the boxed errors returned by `EdgeInput`.
//!
//! With `hardware-errors` enabled, `tacho_hardware::HwError` values are
//! inspected so misuse (unconfigured pin, occupied callback slot) surfaces as
//! a state error rather than a missing device.

use crate::error::{CalibrationError, TachoError};

/// Anything not recognised is reported as `HardwareUnavailable`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TachoError {
    #[cfg(feature = "hardware-errors")]
    {
        use tacho_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::NotConfigured(_) | HwError::CallbackBusy(_) => {
                    TachoError::State(hw.to_string())
                }
                other => TachoError::HardwareUnavailable(other.to_string()),
            };
        }
    }

    TachoError::HardwareUnavailable(e.to_string())
}

/// Same mapping for failures while swapping callbacks during calibration.
pub fn map_calibration_hw_error(e: &(dyn std::error::Error + 'static)) -> CalibrationError {
    CalibrationError::Hardware(map_hw_error(e).to_string())
}
