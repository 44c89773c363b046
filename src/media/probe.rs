use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Result, VelosubError};

/// Probe a media file's duration in seconds using ffprobe.
///
/// Probing failure is fatal for the run: all chunk planning and timeline
/// math downstream depends on this number.
pub fn probe_duration(input: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| VelosubError::Probe(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VelosubError::Probe(format!(
            "ffprobe failed for {}: {}",
            input.display(),
            stderr.trim()
        )));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        VelosubError::Probe(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    if duration_secs < 0.0 {
        return Err(VelosubError::Probe(format!(
            "ffprobe reported negative duration {duration_secs}"
        )));
    }

    debug!("Probed {}: {:.3}s", input.display(), duration_secs);
    Ok(duration_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffprobe_available() -> bool {
        Command::new("ffprobe")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_probe_missing_file() {
        if !ffprobe_available() {
            eprintln!("Skipping test: ffprobe not available");
            return;
        }

        let result = probe_duration(Path::new("/nonexistent/media.mp4"));
        assert!(matches!(result, Err(VelosubError::Probe(_))));
    }
}
