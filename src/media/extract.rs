use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{ExtractionReason, Result, VelosubError};

use super::MediaAsset;

/// Check that ffmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        VelosubError::Extraction {
            reason: ExtractionReason::Unknown,
            detail: format!(
                "ffmpeg not found. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux). Error: {e}"
            ),
        }
    })?;

    if !output.status.success() {
        return Err(VelosubError::Extraction {
            reason: ExtractionReason::Unknown,
            detail: "ffmpeg check failed".to_string(),
        });
    }

    debug!("ffmpeg is available");
    Ok(())
}

/// Check that ffprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            VelosubError::Probe(format!(
                "ffprobe not found. Install ffmpeg (includes ffprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(VelosubError::Probe("ffprobe check failed".to_string()));
    }

    debug!("ffprobe is available");
    Ok(())
}

/// Classify an ffmpeg failure from its stderr diagnostics.
fn classify_stderr(stderr: &str) -> ExtractionReason {
    let lower = stderr.to_lowercase();
    if lower.contains("permission denied") {
        ExtractionReason::PermissionDenied
    } else if lower.contains("no such file or directory") {
        ExtractionReason::MissingInput
    } else if lower.contains("does not contain any stream")
        || lower.contains("output file is empty")
        || lower.contains("stream map 'a' matches no streams")
    {
        ExtractionReason::NoAudioStream
    } else if lower.contains("invalid data found")
        || lower.contains("moov atom not found")
        || lower.contains("could not find codec parameters")
    {
        ExtractionReason::CorruptInput
    } else {
        ExtractionReason::Unknown
    }
}

/// Pull a mono, 16 kHz, speech-optimized audio track out of a video file.
///
/// The output is 64 kbps MP3: small enough that a default-length chunk
/// stays under the upload ceiling, while speech stays intelligible.
/// The output file lands wherever `output` points; the caller owns it and
/// is responsible for its cleanup.
pub fn extract_audio(input: &Path, output: &Path) -> Result<MediaAsset> {
    if !input.exists() {
        return Err(VelosubError::Extraction {
            reason: ExtractionReason::MissingInput,
            detail: input.display().to_string(),
        });
    }

    info!("Extracting audio from {}", input.display());

    let cmd = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args([
            "-vn", "-codec:a", "libmp3lame", "-b:a", "64k", "-ar", "16000", "-ac", "1",
        ])
        .arg(output)
        .output()
        .map_err(|e| VelosubError::Extraction {
            reason: ExtractionReason::Unknown,
            detail: format!("Failed to run ffmpeg: {e}"),
        })?;

    if !cmd.status.success() {
        let stderr = String::from_utf8_lossy(&cmd.stderr);
        return Err(VelosubError::Extraction {
            reason: classify_stderr(&stderr),
            detail: last_stderr_line(&stderr),
        });
    }

    if !output.exists() {
        return Err(VelosubError::Extraction {
            reason: ExtractionReason::Unknown,
            detail: "Output file was not created".to_string(),
        });
    }

    let asset = MediaAsset::probe(output)?;
    info!(
        "Audio extracted to {} ({:.1}s)",
        output.display(),
        asset.duration_secs
    );
    Ok(asset)
}

fn last_stderr_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("ffmpeg produced no diagnostics")
        .trim()
        .to_string()
}
