pub mod plan;
pub mod split;

pub use plan::{plan, ChunkPlan, MAX_UPLOAD_BYTES};
pub use split::split;

use crate::media::MediaAsset;

/// One contiguous, independently-uploadable slice of the optimized audio.
#[derive(Debug, Clone)]
pub struct ChunkAsset {
    pub asset: MediaAsset,
    /// 0-based position in the split sequence.
    pub index: usize,
}

impl ChunkAsset {
    /// The chunk's probed duration, in optimized seconds.
    pub fn duration_secs(&self) -> f64 {
        self.asset.duration_secs
    }
}
