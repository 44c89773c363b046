use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::{Result, VelosubError};

use super::MediaAsset;

/// An audio asset together with the speed factor that produced it.
///
/// A factor of 1.0 means the asset is the original, unscaled audio.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub asset: MediaAsset,
    pub speed_factor: f64,
}

impl OptimizationResult {
    /// Wrap an asset that was not time-scaled.
    pub fn unmodified(asset: MediaAsset) -> Self {
        Self {
            asset,
            speed_factor: 1.0,
        }
    }
}

/// Time-scale audio by `speed_factor` to shrink duration and upload size.
///
/// ffmpeg's atempo filter only accepts factors in [0.5, 2.0] per instance;
/// the pipeline default of 1.2 is well inside that range.
pub fn optimize(input: &MediaAsset, output: &Path, speed_factor: f64) -> Result<OptimizationResult> {
    if speed_factor <= 0.0 {
        return Err(VelosubError::Optimization(format!(
            "Speed factor must be positive, got {speed_factor}"
        )));
    }

    // Skipping is the identity: hand back the same asset, no copy.
    if (speed_factor - 1.0).abs() < f64::EPSILON {
        return Ok(OptimizationResult::unmodified(input.clone()));
    }

    if !(0.5..=2.0).contains(&speed_factor) {
        return Err(VelosubError::Optimization(format!(
            "Speed factor {speed_factor} outside supported range [0.5, 2.0]"
        )));
    }

    info!(
        "Applying {:.2}x speed optimization to {}",
        speed_factor,
        input.path.display()
    );

    let filter = format!("atempo={speed_factor}");
    let cmd = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(&input.path)
        .args(["-filter:a"])
        .arg(&filter)
        .arg(output)
        .output()
        .map_err(|e| VelosubError::Optimization(format!("Failed to run ffmpeg: {e}")))?;

    if !cmd.status.success() {
        let stderr = String::from_utf8_lossy(&cmd.stderr);
        return Err(VelosubError::Optimization(format!(
            "ffmpeg atempo failed: {}",
            stderr.trim()
        )));
    }

    let asset = MediaAsset::probe(output)?;
    info!(
        "Optimized audio: {:.1}s -> {:.1}s, {} -> {} bytes",
        input.duration_secs, asset.duration_secs, input.size_bytes, asset.size_bytes
    );

    Ok(OptimizationResult {
        asset,
        speed_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dummy_asset() -> MediaAsset {
        MediaAsset {
            path: PathBuf::from("/tmp/audio.wav"),
            size_bytes: 1024,
            duration_secs: 10.0,
        }
    }

    #[test]
    fn test_optimize_rejects_zero_factor() {
        let result = optimize(&dummy_asset(), Path::new("/tmp/out.wav"), 0.0);
        assert!(matches!(result, Err(VelosubError::Optimization(_))));
    }

    #[test]
    fn test_optimize_rejects_negative_factor() {
        let result = optimize(&dummy_asset(), Path::new("/tmp/out.wav"), -1.2);
        assert!(matches!(result, Err(VelosubError::Optimization(_))));
    }

    #[test]
    fn test_optimize_identity_returns_same_asset() {
        let asset = dummy_asset();
        let result = optimize(&asset, Path::new("/tmp/out.wav"), 1.0).unwrap();
        assert_eq!(result.speed_factor, 1.0);
        assert_eq!(result.asset.path, asset.path);
    }

    #[test]
    fn test_optimize_rejects_out_of_range_factor() {
        let result = optimize(&dummy_asset(), Path::new("/tmp/out.wav"), 3.0);
        assert!(matches!(result, Err(VelosubError::Optimization(_))));
    }

    #[test]
    fn test_unmodified_wrapper() {
        let result = OptimizationResult::unmodified(dummy_asset());
        assert_eq!(result.speed_factor, 1.0);
    }
}
