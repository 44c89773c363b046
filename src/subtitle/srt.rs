// SRT subtitle format
use super::SubtitleDocument;
use crate::timeline::Timestamp;

/// Render a subtitle document as SRT text.
///
/// Pure formatting over already-reconciled, already-sorted segments.
pub fn render(doc: &SubtitleDocument) -> String {
    doc.cues
        .iter()
        .map(|cue| {
            format!(
                "{}\n{} --> {}\n{}\n",
                cue.index,
                format_timestamp(cue.start),
                format_timestamp(cue.end),
                cue.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `HH:MM:SS,mmm` with unbounded hours. Negative timestamps (possible with
/// a negative user offset) clamp to zero here, keeping internal math exact.
fn format_timestamp(ts: Timestamp) -> String {
    let total_millis = ts.as_millis().max(0);
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}
