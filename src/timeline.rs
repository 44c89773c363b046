//! Timeline reconciliation: mapping per-chunk transcripts, whose timestamps
//! are local to each chunk's optimized time axis, back onto the original
//! media's wall-clock timeline.

use tracing::debug;

use crate::transcribe::RawTranscript;

/// A point on a timeline, stored as integer milliseconds.
///
/// Signed so that a negative user offset can push early segments below zero
/// without wrapping; clamping happens only at serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1000.0).round() as i64)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

/// The per-run transform context: one speed factor and one user offset
/// shared by every chunk.
#[derive(Debug, Clone, Copy)]
pub struct TimelineContext {
    pub speed_factor: f64,
    pub user_offset_secs: f64,
}

impl TimelineContext {
    /// Map a local optimized-time instant to global original time:
    /// `(t + chunk_offset) * speed_factor + user_offset`.
    pub fn to_original(&self, local_secs: f64, chunk_offset_secs: f64) -> Timestamp {
        Timestamp::from_secs_f64(
            (local_secs + chunk_offset_secs) * self.speed_factor + self.user_offset_secs,
        )
    }
}

/// One chunk's transcript paired with the chunk's own probed duration.
///
/// The duration is measured on the chunk asset itself, not taken from the
/// plan: plans are requests, not guarantees.
#[derive(Debug, Clone)]
pub struct ChunkTranscript {
    pub index: usize,
    /// Optimized-time duration of the chunk asset.
    pub duration_secs: f64,
    pub transcript: RawTranscript,
}

/// A transcript segment in global original time.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
    pub words: Option<Vec<Word>>,
}

#[derive(Debug, Clone)]
pub struct Word {
    pub word: String,
    pub start: Timestamp,
    pub end: Timestamp,
}

/// The merged, globally time-ordered transcript in original time.
#[derive(Debug, Clone)]
pub struct ReconciledTranscript {
    pub text: String,
    pub language: String,
    /// Total original-time duration of the transcribed audio.
    pub duration: Timestamp,
    pub segments: Vec<Segment>,
}

/// Merge per-chunk transcripts into one globally-ordered transcript.
///
/// Chunk start offsets are a prefix sum over the probed chunk durations, so
/// a chunk with zero segments (or zero duration) still advances the offset
/// seen by its successors by exactly its real duration.
pub fn reconcile(chunks: &[ChunkTranscript], ctx: &TimelineContext) -> ReconciledTranscript {
    let offsets = prefix_offsets(chunks);
    let total_optimized_secs: f64 = chunks.iter().map(|c| c.duration_secs).sum();

    let mut segments = Vec::new();
    let mut texts: Vec<&str> = Vec::new();
    let mut language = None;

    for (chunk, offset) in chunks.iter().zip(offsets.iter()) {
        match &language {
            None => language = Some(chunk.transcript.language.clone()),
            Some(first) if *first != chunk.transcript.language => {
                debug!(
                    "Chunk {} detected language '{}' differs from first chunk's, keeping the first",
                    chunk.index, chunk.transcript.language
                );
            }
            _ => {}
        }

        let text = chunk.transcript.text.trim();
        if !text.is_empty() {
            texts.push(text);
        }

        for seg in &chunk.transcript.segments {
            let words = seg.words.as_ref().map(|words| {
                words
                    .iter()
                    .map(|w| Word {
                        word: w.word.clone(),
                        start: ctx.to_original(w.start, *offset),
                        end: ctx.to_original(w.end, *offset),
                    })
                    .collect()
            });

            segments.push(Segment {
                start: ctx.to_original(seg.start, *offset),
                end: ctx.to_original(seg.end, *offset),
                text: seg.text.clone(),
                words,
            });
        }
    }

    // Chunking already guarantees near-ordering; the stable sort makes the
    // final order an invariant rather than an assumption, and never reorders
    // equal start times away from chunk order.
    segments.sort_by_key(|s| s.start);

    ReconciledTranscript {
        text: texts.join("\n"),
        language: language.unwrap_or_else(|| "unknown".to_string()),
        duration: Timestamp::from_secs_f64(total_optimized_secs * ctx.speed_factor),
        segments,
    }
}

/// Optimized-time start offset for each chunk: the sum of the durations of
/// all chunks before it.
fn prefix_offsets(chunks: &[ChunkTranscript]) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut acc = 0.0;
    for chunk in chunks {
        offsets.push(acc);
        acc += chunk.duration_secs;
    }
    offsets
}
