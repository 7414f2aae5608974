//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tacho", version, about = "Encoder tachometer CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/tacho_config.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides [logging] level, RUST_LOG wins
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Simulated shaft speed used when built without the `hardware` feature
    #[arg(long = "sim-rpm", value_name = "RPM", default_value_t = 600.0)]
    pub sim_rpm: f64,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print live RPM readings until Ctrl-C or the duration elapses
    Monitor {
        /// Stop after this many seconds (default: run until Ctrl-C)
        #[arg(long = "duration-s", value_name = "SECS")]
        duration_s: Option<f64>,
        /// Read-out period in milliseconds
        #[arg(long = "interval-ms", value_name = "MS", default_value_t = 1000)]
        interval_ms: u64,
        /// Write a JSON snapshot to [snapshot] dir on exit
        #[arg(long, action = ArgAction::SetTrue)]
        save: bool,
    },
    /// Measure the encoder's pulses per revolution at a known speed
    Calibrate {
        /// Reference shaft speed in RPM
        #[arg(long = "known-rpm", value_name = "RPM", allow_negative_numbers = true)]
        known_rpm: f64,
        /// Counting window in seconds
        #[arg(long = "duration-s", value_name = "SECS", default_value_t = 5.0)]
        duration_s: f64,
    },
    /// Quick health check (input available, capture starts and stops)
    SelfCheck,
}
