pub mod srt;

pub use srt::render;

use crate::timeline::{ReconciledTranscript, Timestamp};

/// One timed caption block.
#[derive(Debug, Clone)]
pub struct SubtitleCue {
    /// 1-based sequential cue number.
    pub index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

/// An ordered sequence of cues, derived 1:1 from reconciled segments.
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    pub cues: Vec<SubtitleCue>,
}

impl SubtitleDocument {
    pub fn from_transcript(transcript: &ReconciledTranscript) -> Self {
        let cues = transcript
            .segments
            .iter()
            .enumerate()
            .map(|(i, segment)| SubtitleCue {
                index: i + 1,
                start: segment.start,
                end: segment.end,
                text: segment.text.trim().to_string(),
            })
            .collect();

        Self { cues }
    }
}
