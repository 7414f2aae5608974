mod cli;
mod error_fmt;
mod monitor;
mod persist;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use tacho_core::conversions::pull_from_cfg;
use tacho_core::{EncoderConfig, RpmFilter, TachoError, Tachometer};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::monitor::{MonitorOpts, run_calibrate, run_monitor, run_self_check};

#[cfg(all(feature = "hardware", target_os = "linux"))]
type Input = tacho_hardware::gpio::GpioInput;
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
type Input = tacho_hardware::SimulatedEncoder;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let tacho = build_tachometer(&cfg, cli.sim_rpm)?;

    match cli.cmd {
        Commands::Monitor {
            duration_s,
            interval_ms,
            save,
        } => {
            let duration = match duration_s {
                Some(s) if s > 0.0 => match Duration::try_from_secs_f64(s) {
                    Ok(d) => Some(d),
                    Err(_) => eyre::bail!("--duration-s is out of range, got {s}"),
                },
                Some(s) => eyre::bail!("--duration-s must be > 0, got {s}"),
                None => None,
            };
            let mut filter = RpmFilter::from_cfg(&(&cfg.filter).into())?;
            let opts = MonitorOpts {
                duration,
                interval: Duration::from_millis(interval_ms.max(1)),
                save_dir: save.then(|| PathBuf::from(&cfg.snapshot.dir)),
                json: cli.json,
            };

            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }
            run_monitor(&tacho, &mut filter, &opts, &shutdown)
        }
        Commands::Calibrate {
            known_rpm,
            duration_s,
        } => run_calibrate(&tacho, known_rpm, duration_s, cli.json),
        Commands::SelfCheck => run_self_check(&tacho),
    }
}

fn load_config(path: &Path) -> eyre::Result<tacho_config::Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| TachoError::Config(format!("cannot read {}: {e}", path.display())))?;
    let cfg = tacho_config::load_toml(&text)
        .map_err(|e| TachoError::Config(format!("{}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| TachoError::Config(e.to_string()))?;
    Ok(cfg)
}

fn init_tracing(cli: &Cli, logging: &tacho_config::Logging) -> eyre::Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (json_layer, pretty_layer) = if cli.json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| TachoError::Config(format!("logging.file has no file name: {file}")))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .try_init()
        .wrap_err("installing tracing subscriber")?;
    Ok(())
}

fn open_input(cfg: &tacho_config::Config, sim_rpm: f64) -> eyre::Result<Input> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let _ = (cfg, sim_rpm);
        tacho_hardware::gpio::GpioInput::new()
            .map_err(|e| TachoError::HardwareUnavailable(e.to_string()).into())
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        tracing::info!(rpm = sim_rpm, ppr = cfg.encoder.ppr, "using simulated encoder");
        Ok(tacho_hardware::SimulatedEncoder::new(cfg.encoder.ppr, sim_rpm))
    }
}

fn build_tachometer(cfg: &tacho_config::Config, sim_rpm: f64) -> eyre::Result<Tachometer<Input>> {
    let encoder = EncoderConfig::try_from(&cfg.encoder)?;
    let tacho = Tachometer::builder()
        .with_input(open_input(cfg, sim_rpm)?)
        .with_encoder(encoder)
        .with_estimator((&cfg.estimator).into())
        .with_stats((&cfg.stats).into())
        .pin(cfg.input.pin)
        .pull(pull_from_cfg(cfg.input.pull))
        .try_build()?;
    Ok(tacho)
}
