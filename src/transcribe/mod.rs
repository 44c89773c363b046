pub mod orchestrator;
pub mod whisper;

pub use orchestrator::TranscriptionOrchestrator;
pub use whisper::WhisperClient;

use crate::chunk::ChunkAsset;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// A transcript as the remote service returns it: timestamps are seconds,
/// local to the uploaded asset's own (optimized) time axis, starting at zero.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTranscript {
    pub language: String,
    pub duration: f64,
    pub text: String,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub words: Option<Vec<RawWord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, chunk: &ChunkAsset) -> Result<RawTranscript>;
    fn name(&self) -> &'static str;
}
