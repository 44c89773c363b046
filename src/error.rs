use thiserror::Error;

/// Why an audio extraction failed, classified from ffmpeg's diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionReason {
    PermissionDenied,
    MissingInput,
    CorruptInput,
    NoAudioStream,
    Unknown,
}

impl std::fmt::Display for ExtractionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ExtractionReason::PermissionDenied => "permission denied reading the input file",
            ExtractionReason::MissingInput => "input file does not exist",
            ExtractionReason::CorruptInput => "input file is corrupt or not decodable",
            ExtractionReason::NoAudioStream => "input file contains no audio stream",
            ExtractionReason::Unknown => "unknown extraction failure",
        };
        write!(f, "{msg}")
    }
}

#[derive(Error, Debug)]
pub enum VelosubError {
    #[error("Duration probe failed: {0}")]
    Probe(String),

    #[error("Audio extraction failed ({reason}): {detail}")]
    Extraction {
        reason: ExtractionReason,
        detail: String,
    },

    #[error("Speed optimization failed: {0}")]
    Optimization(String),

    #[error("Audio chunking failed: {0}")]
    Chunking(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Unsupported file format '{0}'. Supported: mp3, mp4, m4a, mov, mkv, avi, wav, webm, flac, ogg")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VelosubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_message_includes_reason() {
        let err = VelosubError::Extraction {
            reason: ExtractionReason::NoAudioStream,
            detail: "Output file #0 does not contain any stream".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("no audio stream"));
        assert!(msg.contains("does not contain any stream"));
    }

    #[test]
    fn test_unsupported_format_lists_alternatives() {
        let err = VelosubError::UnsupportedFormat("xyz".to_string());
        assert!(err.to_string().contains("mp3"));
    }
}
