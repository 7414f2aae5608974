//! Live read-out loop and the one-shot calibration command.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tacho_core::{RpmFilter, RpmStats, Tachometer};
use tacho_traits::EdgeInput;

use crate::persist::save_snapshot;

pub struct MonitorOpts {
    pub duration: Option<Duration>,
    pub interval: Duration,
    pub save_dir: Option<PathBuf>,
    pub json: bool,
}

/// Run capture until `shutdown` is set or the duration elapses, printing one
/// line per interval. Capture is stopped before returning, even on error.
pub fn run_monitor<I: EdgeInput + Send + 'static>(
    tacho: &Tachometer<I>,
    filter: &mut RpmFilter,
    opts: &MonitorOpts,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<()> {
    tacho.start()?;
    let started = Instant::now();
    let mut lines = 0u64;

    while !shutdown.load(Ordering::Relaxed) {
        sleep_interruptible(opts.interval, shutdown);
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let raw = tacho.current_rpm();
        let stats = tacho.stats();
        let smoothed = smoothed_reading(filter, raw, &stats);
        print_reading(raw, smoothed, &stats, opts.json);
        lines += 1;

        if opts.duration.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
    }
    tacho.stop();
    tracing::debug!(lines, elapsed_ms = started.elapsed().as_millis() as u64, "monitor finished");

    if let Some(dir) = &opts.save_dir {
        let path = save_snapshot(dir, &tacho.export_snapshot())?;
        if opts.json {
            println!("{}", serde_json::json!({ "snapshot": path.display().to_string() }));
        } else {
            println!("Snapshot saved to {}", path.display());
        }
    }
    Ok(())
}

fn sleep_interruptible(total: Duration, shutdown: &AtomicBool) {
    let step = Duration::from_millis(20);
    let deadline = Instant::now() + total;
    loop {
        let now = Instant::now();
        if now >= deadline || shutdown.load(Ordering::Relaxed) {
            return;
        }
        std::thread::sleep(step.min(deadline - now));
    }
}

/// The filter only sees readings backed by a full stats window, so waiting
/// lines never seed it with zeros.
fn smoothed_reading(filter: &mut RpmFilter, raw: f64, stats: &RpmStats) -> Option<f64> {
    stats.summary.as_ref().map(|_| filter.filter(raw))
}

fn print_reading(raw: f64, smoothed: Option<f64>, stats: &RpmStats, json: bool) {
    if json {
        let line = serde_json::json!({
            "raw_rpm": raw,
            "filtered_rpm": smoothed,
            "stats": stats,
        });
        println!("{line}");
        return;
    }
    match (&stats.summary, smoothed) {
        (Some(s), Some(smoothed)) => println!(
            "RPM {smoothed:8.1} (raw {raw:8.1}) | avg {:8.1} min {:8.1} max {:8.1} | std {:6.2} | {:8.1} Hz | stability {:5.1}% | {}",
            s.avg_rpm,
            s.min_rpm,
            s.max_rpm,
            s.std_rpm,
            s.pulse_frequency_hz,
            s.stability_percent,
            stats.status
        ),
        _ => println!(
            "Waiting for data... RPM {raw:8.1} ({} samples) | {}",
            stats.samples, stats.status
        ),
    }
}

pub fn run_calibrate<I: EdgeInput + Send + 'static>(
    tacho: &Tachometer<I>,
    known_rpm: f64,
    duration_s: f64,
    json: bool,
) -> eyre::Result<()> {
    if !json {
        println!("Counting pulses for {duration_s:.1} s at {known_rpm:.1} RPM...");
    }
    let r = tacho.calibrate(known_rpm, duration_s)?;
    if json {
        println!("{}", serde_json::to_string(&r)?);
    } else {
        println!("Pulses counted: {}", r.pulse_count);
        println!("Elapsed:        {:.3} s", r.elapsed_s);
        println!("Measured PPR:   {:.2}", r.measured_ppr);
        println!(
            "Configured PPR: {} ({:+.1}% deviation)",
            r.configured_ppr,
            r.deviation_percent()
        );
    }
    Ok(())
}

pub fn run_self_check<I: EdgeInput + Send + 'static>(tacho: &Tachometer<I>) -> eyre::Result<()> {
    tacho.start()?;
    std::thread::sleep(Duration::from_millis(250));
    let rpm = tacho.current_rpm();
    tacho.stop();
    println!("OK: input pin {} ready, current RPM {rpm:.1}", tacho.pin());
    Ok(())
}
