pub mod extract;
pub mod optimize;
pub mod probe;

pub use extract::{check_ffmpeg, check_ffprobe, extract_audio};
pub use optimize::{optimize, OptimizationResult};
pub use probe::probe_duration;

use crate::error::{Result, VelosubError};
use std::path::{Path, PathBuf};

/// Extensions accepted as audio-only input (no extraction pass needed).
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "webm", "flac", "ogg", "mpga"];

/// Extensions accepted as video input (audio is extracted first).
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "mpeg"];

/// A media file on disk together with its probed properties.
///
/// The asset does not own its file: intermediate files produced by the
/// pipeline all live inside the run's temp directory, which handles deletion.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub path: PathBuf,
    /// File size in bytes at creation time.
    pub size_bytes: u64,
    /// Duration in seconds, on this asset's own time axis.
    pub duration_secs: f64,
}

impl MediaAsset {
    /// Build an asset by reading its size and probing its duration.
    pub fn probe(path: &Path) -> Result<Self> {
        let size_bytes = std::fs::metadata(path)?.len();
        let duration_secs = probe_duration(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs,
        })
    }
}

/// Kind of media a file extension implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Classify an input path by extension, rejecting unsupported formats.
pub fn classify_input(path: &Path) -> Result<MediaKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Audio)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Video)
    } else {
        Err(VelosubError::UnsupportedFormat(ext))
    }
}
