use crate::chunk::{ChunkAsset, MAX_UPLOAD_BYTES};
use crate::error::{Result, VelosubError};
use crate::transcribe::{RawTranscript, Transcriber};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, warn};

/// Default transcription API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Maximum attempts per chunk upload.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// Client for the remote speech-recognition service.
///
/// One network call per chunk; transient failures (transport errors, 5xx)
/// are retried with backoff and jitter, but the already-completed chunking
/// step is never re-run. 4xx responses are never retried.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: Option<String>,
}

impl WhisperClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            language: None,
        }
    }

    /// Point the client at a different API host (used by tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the expected source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.base_url)
    }

    /// Build the multipart form. The declared content type must match the
    /// asset's container format.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") => "audio/ogg",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        Ok(form)
    }

    /// One API call. The form is consumed, so retries rebuild it upstream.
    async fn call_api(&self, form: Form) -> Result<RawTranscript> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!("Transcription API response status: {}", status);

        if status.is_success() {
            let body = response.text().await?;
            let parsed: RawTranscript = serde_json::from_str(&body).map_err(|e| {
                VelosubError::Api(format!("Malformed transcript response: {e}"))
            })?;
            validate_transcript(&parsed)?;
            return Ok(parsed);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(VelosubError::Api(format!(
                "Transcription API error ({status}): {}",
                api_error.error.message
            )));
        }

        Err(VelosubError::Api(format!(
            "Transcription API error ({status}): {error_body}"
        )))
    }

    /// Retry with exponential backoff and jitter, rebuilding the form each
    /// attempt. Client errors (4xx) are surfaced immediately.
    async fn transcribe_with_retry(&self, chunk: &ChunkAsset) -> Result<RawTranscript> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1) + jitter_ms();
                debug!("Retry attempt {} after {}ms delay", attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let form = self.build_form(&chunk.asset.path).await?;

            match self.call_api(form).await {
                Ok(transcript) => return Ok(transcript),
                Err(e) => {
                    if !is_retryable(&e) {
                        return Err(e);
                    }
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| VelosubError::Api("Transcription failed with no error".to_string())))
    }
}

/// Transport failures and server-side errors are worth another attempt;
/// anything the caller can't change by waiting is not.
fn is_retryable(error: &VelosubError) -> bool {
    match error {
        VelosubError::Http(_) => true,
        VelosubError::Api(msg) => msg.contains("(5"),
        _ => false,
    }
}

fn jitter_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()) % 250)
        .unwrap_or(0)
}

/// Reject responses whose numbers cannot be real timestamps.
fn validate_transcript(transcript: &RawTranscript) -> Result<()> {
    if transcript.duration < 0.0 {
        return Err(VelosubError::Api(format!(
            "Transcript reports negative duration {}",
            transcript.duration
        )));
    }
    for seg in &transcript.segments {
        if seg.start < 0.0 || seg.end < seg.start {
            return Err(VelosubError::Api(format!(
                "Transcript segment has invalid timestamps [{}, {}]",
                seg.start, seg.end
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, chunk: &ChunkAsset) -> Result<RawTranscript> {
        debug!(
            "Transcribing chunk {}: {}",
            chunk.index,
            chunk.asset.path.display()
        );

        let metadata = fs::metadata(&chunk.asset.path).await?;
        if metadata.len() > MAX_UPLOAD_BYTES {
            return Err(VelosubError::Transcription(format!(
                "Chunk {} is {} bytes, over the {} byte upload ceiling",
                chunk.index,
                metadata.len(),
                MAX_UPLOAD_BYTES
            )));
        }

        let transcript = self.transcribe_with_retry(chunk).await?;

        debug!(
            "Chunk {} transcribed: {} segments, language '{}'",
            chunk.index,
            transcript.segments.len(),
            transcript.language
        );

        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "whisper"
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
