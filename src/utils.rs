use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{info, warn};

/// ffmpeg and ffprobe must be on PATH; there is no auto-install fallback.
pub fn ensure_ffmpeg() -> anyhow::Result<()> {
    for tool in ["ffmpeg", "ffprobe"] {
        let ok = Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !ok {
            anyhow::bail!("{tool} not found in PATH; install it before running");
        }
    }
    info!("FFmpeg toolchain is operational");
    Ok(())
}

/// Remove intermediate assets after a run. Failures are logged, not fatal.
pub fn cleanup(files: &[PathBuf]) {
    for f in files {
        if !f.exists() {
            continue;
        }
        match std::fs::remove_file(f) {
            Ok(()) => info!("Deleted temp file: {}", f.display()),
            Err(e) => warn!("Failed to delete {}: {}", f.display(), e),
        }
    }
}
