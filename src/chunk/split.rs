use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Result, VelosubError};
use crate::media::MediaAsset;

use super::plan::MAX_UPLOAD_BYTES;
use super::ChunkAsset;

/// Tolerance for the contiguity check: the chunk durations must sum back to
/// the source duration within this many seconds.
const CONTIGUITY_TOLERANCE_SECS: f64 = 2.0;

/// Split one audio stream into contiguous pieces of the planned length.
///
/// Each chunk's internal clock restarts at zero (`-reset_timestamps 1`), and
/// each chunk is re-probed afterwards: plans are requests, not guarantees,
/// and the reconciler needs the real durations.
pub fn split(asset: &MediaAsset, chunk_secs_optimized: f64, output_dir: &Path) -> Result<Vec<ChunkAsset>> {
    if chunk_secs_optimized <= 0.0 {
        return Err(VelosubError::Chunking(format!(
            "Chunk length must be positive, got {chunk_secs_optimized}s"
        )));
    }

    std::fs::create_dir_all(output_dir)
        .map_err(|e| VelosubError::Chunking(format!("Failed to create chunk directory: {e}")))?;

    let ext = asset
        .path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("wav");
    let pattern = output_dir.join(format!("chunk_%04d.{ext}"));

    info!(
        "Splitting {} into {:.1}s pieces",
        asset.path.display(),
        chunk_secs_optimized
    );

    let segment_time = format!("{chunk_secs_optimized:.3}");
    let cmd = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(&asset.path)
        .args(["-f", "segment", "-segment_time"])
        .arg(&segment_time)
        .args(["-reset_timestamps", "1", "-c", "copy"])
        .arg(&pattern)
        .output()
        .map_err(|e| VelosubError::Chunking(format!("Failed to run ffmpeg: {e}")))?;

    if !cmd.status.success() {
        let stderr = String::from_utf8_lossy(&cmd.stderr);
        return Err(VelosubError::Chunking(format!(
            "ffmpeg segmenting failed: {}",
            stderr.trim()
        )));
    }

    let chunks = collect_chunks(output_dir, ext)?;
    if chunks.is_empty() {
        return Err(VelosubError::Chunking(
            "Splitting produced no output files".to_string(),
        ));
    }

    verify_upload_ceiling(&chunks)?;
    verify_contiguity(&chunks, asset.duration_secs)?;

    info!("Created {} chunks", chunks.len());
    Ok(chunks)
}

/// Gather and probe the segment files in index order.
fn collect_chunks(output_dir: &Path, ext: &str) -> Result<Vec<ChunkAsset>> {
    let mut chunks = Vec::new();

    for index in 0.. {
        let path = output_dir.join(format!("chunk_{index:04}.{ext}"));
        if !path.exists() {
            break;
        }
        let asset = MediaAsset::probe(&path)?;
        debug!(
            "Chunk {}: {:.3}s, {} bytes",
            index, asset.duration_secs, asset.size_bytes
        );
        chunks.push(ChunkAsset { asset, index });
    }

    Ok(chunks)
}

/// No chunk may exceed the remote service's payload ceiling. This is a
/// fatal configuration condition: repeated trial compression is a known
/// failure-prone heuristic, so the fix is on the user's side.
fn verify_upload_ceiling(chunks: &[ChunkAsset]) -> Result<()> {
    for chunk in chunks {
        if chunk.asset.size_bytes > MAX_UPLOAD_BYTES {
            return Err(VelosubError::Chunking(format!(
                "Chunk {} is {} bytes, over the {} byte upload ceiling. \
                 Lower --chunk-minutes or re-enable speed optimization.",
                chunk.index, chunk.asset.size_bytes, MAX_UPLOAD_BYTES
            )));
        }
    }
    Ok(())
}

/// The chunk set must be contiguous and gapless relative to the source.
fn verify_contiguity(chunks: &[ChunkAsset], source_duration_secs: f64) -> Result<()> {
    let total: f64 = chunks.iter().map(|c| c.asset.duration_secs).sum();
    let drift = (total - source_duration_secs).abs();
    if drift > CONTIGUITY_TOLERANCE_SECS {
        return Err(VelosubError::Chunking(format!(
            "Chunk durations sum to {total:.2}s but source is {source_duration_secs:.2}s \
             ({drift:.2}s drift); the split is not gapless"
        )));
    }
    Ok(())
}
