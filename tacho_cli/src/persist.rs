//! Snapshot files for later analysis.

use std::path::{Path, PathBuf};
use std::{fs, io::Write};

use tacho_core::Snapshot;

pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

/// `<dir>/motor_speed_log_<unix_secs>.json`
pub fn snapshot_path(dir: &Path, snap: &Snapshot) -> PathBuf {
    dir.join(format!("motor_speed_log_{}.json", snap.timestamp / 1000))
}

pub fn save_snapshot(dir: &Path, snap: &Snapshot) -> eyre::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = snapshot_path(dir, snap);
    let bytes = serde_json::to_vec_pretty(snap)?;
    write_atomic(&path, &bytes)?;
    tracing::info!(path = %path.display(), samples = snap.rpm_history.len(), "snapshot saved");
    Ok(path)
}
