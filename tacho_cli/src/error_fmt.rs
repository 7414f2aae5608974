//! Human-readable error descriptions and structured JSON error formatting.

use tacho_core::error::{BuildError, CalibrationError, TachoError};

fn calibration_text(ce: &CalibrationError) -> String {
    match ce {
        CalibrationError::InvalidKnownRpm(v) => format!(
            "What happened: Reference speed {v} RPM is not usable.\nLikely causes: --known-rpm missing a value, zero or negative.\nHow to fix: Pass the measured shaft speed, e.g. `tacho calibrate --known-rpm 1500`."
        ),
        CalibrationError::InvalidDuration(v) => format!(
            "What happened: Calibration window of {v} s is not usable.\nLikely causes: --duration-s is zero or negative.\nHow to fix: Use a window of a few seconds, e.g. `--duration-s 5`."
        ),
        CalibrationError::NoPulses => {
            "What happened: No encoder pulses were counted during calibration.\nLikely causes: Motor not turning, encoder unpowered, or wrong [input] pin.\nHow to fix: Spin the motor at the reference speed, check encoder wiring and [input] pin/pull, then retry.".to_string()
        }
        CalibrationError::Busy => {
            "What happened: A calibration is already running.\nLikely causes: Two calibration requests overlapped.\nHow to fix: Wait for the running calibration to finish.".to_string()
        }
        CalibrationError::Hardware(msg) => format!(
            "What happened: The input could not be switched to pulse counting ({msg}).\nLikely causes: GPIO busy or insufficient permissions.\nHow to fix: Stop other programs using the pin and make sure the process can access GPIO."
        ),
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingInput => {
                "What happened: No edge input was provided to the tachometer.\nLikely causes: The GPIO backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the input is created successfully and passed via with_input(...).".to_string()
            }
            BuildError::MissingEncoder => {
                "What happened: No encoder configuration was provided.\nLikely causes: The [encoder] section was not mapped into the builder.\nHow to fix: Add [encoder] ppr/rpm_max to the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [estimator] or [stats] sections.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CalibrationError>() {
        return calibration_text(ce);
    }

    if let Some(te) = err.downcast_ref::<TachoError>() {
        return match te {
            TachoError::Config(msg) => format!(
                "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Missing [input]/[encoder] sections or out-of-range values.\nHow to fix: Edit the TOML config (see etc/tacho_config.toml) and try again."
            ),
            TachoError::HardwareUnavailable(msg) => format!(
                "What happened: The encoder input is unavailable ({msg}).\nLikely causes: Wrong pin number, GPIO already in use, or insufficient permissions.\nHow to fix: Check [input] pin in the config and run with GPIO access (e.g. gpio group)."
            ),
            TachoError::Calibration(ce) => calibration_text(ce),
            TachoError::State(msg) => format!(
                "What happened: Operation not allowed right now ({msg}).\nLikely causes: Capture already running or calibration in progress.\nHow to fix: Stop the running capture first."
            ),
            TachoError::Io(msg) => format!(
                "What happened: I/O failure ({msg}).\nLikely causes: Thread limit reached or unwritable directory.\nHow to fix: Re-run with --log-level=debug for details."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes: config 2, hardware 3, calibration 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if err.downcast_ref::<CalibrationError>().is_some() {
        return 4;
    }
    match err.downcast_ref::<TachoError>() {
        Some(TachoError::Config(_)) => 2,
        Some(TachoError::HardwareUnavailable(_)) => 3,
        Some(TachoError::Calibration(_)) => 4,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        2 => "Config",
        3 => "HardwareUnavailable",
        4 => "Calibration",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
