use tracing::{debug, info};

use crate::error::{Result, VelosubError};
use crate::media::MediaAsset;

/// Hard per-request payload ceiling, with headroom under the service's 25 MB limit.
pub const MAX_UPLOAD_BYTES: u64 = 24 * 1024 * 1024;

/// Original-time duration above which chunking kicks in automatically.
const AUTO_CHUNK_THRESHOLD_SECS: f64 = 45.0 * 60.0;

/// Default chunk length in original seconds when auto-chunking.
const DEFAULT_CHUNK_SECS: f64 = 20.0 * 60.0;

/// Floor for the chunk length, to avoid pathological over-chunking.
const MIN_CHUNK_SECS: f64 = 60.0;

/// The chunking decision for one run. Computed once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    pub should_chunk: bool,
    /// Target chunk length in original seconds.
    pub chunk_secs_original: f64,
    /// The same length on the optimized time axis (= original / speed factor).
    pub chunk_secs_optimized: f64,
}

impl ChunkPlan {
    fn none() -> Self {
        Self {
            should_chunk: false,
            chunk_secs_original: 0.0,
            chunk_secs_optimized: 0.0,
        }
    }

    fn chunked(chunk_secs_original: f64, speed_factor: f64) -> Self {
        let clamped = chunk_secs_original.max(MIN_CHUNK_SECS);
        Self {
            should_chunk: true,
            chunk_secs_original: clamped,
            // The splitter operates on the optimized asset, so the length it
            // receives must be expressed on that axis.
            chunk_secs_optimized: clamped / speed_factor,
        }
    }
}

/// Decide whether and how to split the (possibly speed-scaled) audio.
///
/// Decision order, first match wins:
/// 1. an explicit chunk length always chunks at that length;
/// 2. a file over the upload ceiling chunks at the default length;
/// 3. an original-time duration over 45 minutes chunks at the default length;
/// 4. otherwise the asset is uploaded whole.
pub fn plan(
    asset: &MediaAsset,
    speed_factor: f64,
    explicit_chunk_minutes: Option<f64>,
) -> Result<ChunkPlan> {
    if speed_factor <= 0.0 {
        return Err(VelosubError::Chunking(format!(
            "Speed factor must be positive, got {speed_factor}"
        )));
    }

    let duration_original = asset.duration_secs * speed_factor;

    let plan = if let Some(minutes) = explicit_chunk_minutes {
        if minutes <= 0.0 {
            return Err(VelosubError::Chunking(format!(
                "Chunk length must be positive, got {minutes} minutes"
            )));
        }
        info!("Chunking at explicit {minutes} minute length");
        ChunkPlan::chunked(minutes * 60.0, speed_factor)
    } else if asset.size_bytes > MAX_UPLOAD_BYTES {
        info!(
            "File size {} bytes exceeds upload ceiling {}, chunking",
            asset.size_bytes, MAX_UPLOAD_BYTES
        );
        ChunkPlan::chunked(DEFAULT_CHUNK_SECS, speed_factor)
    } else if duration_original > AUTO_CHUNK_THRESHOLD_SECS {
        info!(
            "Duration {:.0}s exceeds auto-chunk threshold {:.0}s, chunking",
            duration_original, AUTO_CHUNK_THRESHOLD_SECS
        );
        ChunkPlan::chunked(DEFAULT_CHUNK_SECS, speed_factor)
    } else {
        debug!(
            "No chunking needed ({:.0}s, {} bytes)",
            duration_original, asset.size_bytes
        );
        ChunkPlan::none()
    };

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn asset(duration_secs: f64, size_bytes: u64) -> MediaAsset {
        MediaAsset {
            path: PathBuf::from("/tmp/audio.wav"),
            size_bytes,
            duration_secs,
        }
    }

    #[test]
    fn test_short_small_file_not_chunked() {
        // 10 minutes, 10 MB
        let plan = plan(&asset(600.0, 10 * 1024 * 1024), 1.0, None).unwrap();
        assert!(!plan.should_chunk);
    }

    #[test]
    fn test_long_file_chunked_by_duration() {
        // 50 minutes, 10 MB: duration threshold triggers, default length used
        let plan = plan(&asset(3000.0, 10 * 1024 * 1024), 1.0, None).unwrap();
        assert!(plan.should_chunk);
        assert_eq!(plan.chunk_secs_original, 20.0 * 60.0);
    }

    #[test]
    fn test_large_file_chunked_regardless_of_duration() {
        // 5 minutes but 30 MB: size threshold triggers
        let plan = plan(&asset(300.0, 30 * 1024 * 1024), 1.0, None).unwrap();
        assert!(plan.should_chunk);
    }

    #[test]
    fn test_explicit_chunk_size_always_chunks() {
        let plan = plan(&asset(120.0, 1024), 1.0, Some(5.0)).unwrap();
        assert!(plan.should_chunk);
        assert_eq!(plan.chunk_secs_original, 300.0);
    }

    #[test]
    fn test_chunk_length_clamped_to_floor() {
        // 0.1 minutes = 6s, below the 60s floor
        let plan = plan(&asset(3000.0, 1024), 1.0, Some(0.1)).unwrap();
        assert_eq!(plan.chunk_secs_original, 60.0);
    }

    #[test]
    fn test_optimized_length_divides_by_speed_factor() {
        let plan = plan(&asset(3000.0, 1024), 1.2, Some(20.0)).unwrap();
        assert_eq!(plan.chunk_secs_original, 1200.0);
        assert!((plan.chunk_secs_optimized - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_duration_threshold_uses_original_time() {
        // 40 optimized minutes at 1.2x is 48 original minutes: over threshold
        let plan = plan(&asset(2400.0, 1024), 1.2, None).unwrap();
        assert!(plan.should_chunk);

        // The same optimized duration at 1.0x is under threshold
        let plan = super::plan(&asset(2400.0, 1024), 1.0, None).unwrap();
        assert!(!plan.should_chunk);
    }

    #[test]
    fn test_rejects_zero_speed_factor() {
        assert!(plan(&asset(600.0, 1024), 0.0, None).is_err());
    }

    #[test]
    fn test_rejects_nonpositive_explicit_length() {
        assert!(plan(&asset(600.0, 1024), 1.0, Some(0.0)).is_err());
        assert!(plan(&asset(600.0, 1024), 1.0, Some(-5.0)).is_err());
    }
}
