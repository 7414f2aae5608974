//! Serializable export of the tachometer state for external persistence.
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::stats::RpmStats;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Wall-clock capture time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub ppr: u32,
    /// `[rpm_min, rpm_max]`
    pub rpm_range: [f64; 2],
    /// Oldest first.
    pub rpm_history: Vec<f64>,
    pub stats: RpmStats,
}

pub(crate) fn unix_millis(now: SystemTime) -> u64 {
    now.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
