//! External encoder binary discovery and capability probing.
//!
//! Runs once at startup; the result is cached in the encoder probe and
//! never re-evaluated per frame.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Locate the ffmpeg binary: explicit config path first, then PATH.
pub fn locate(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        let path = PathBuf::from(p);
        if path.is_file() {
            return Some(path);
        }
        tracing::warn!(path = p, "configured ffmpeg path does not exist, searching PATH");
    }
    find_in_path()
}

fn find_in_path() -> Option<PathBuf> {
    let exe = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(exe))
        .find(|candidate| candidate.is_file())
}

/// Whether the binary exposes the NVENC H.264 encoder.
pub fn supports_nvenc(ffmpeg: &Path) -> bool {
    match Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .output()
    {
        Ok(out) => lists_nvenc(&String::from_utf8_lossy(&out.stdout)),
        Err(e) => {
            tracing::debug!(error = %e, "encoder listing failed");
            false
        }
    }
}

fn lists_nvenc(output: &str) -> bool {
    output.lines().any(|line| line.contains("h264_nvenc"))
}
