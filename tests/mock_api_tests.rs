//! Transcription client tests against a mocked API server.

use velosub::chunk::ChunkAsset;
use velosub::error::VelosubError;
use velosub::media::MediaAsset;
use velosub::transcribe::{Transcriber, WhisperClient};

use serde_json::json;
use std::path::PathBuf;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_chunk(audio_path: PathBuf) -> ChunkAsset {
    ChunkAsset {
        asset: MediaAsset {
            path: audio_path,
            size_bytes: 64,
            duration_secs: 5.0,
        },
        index: 0,
    }
}

fn write_fake_audio(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("chunk_0000.mp3");
    std::fs::write(&path, b"ID3 fake audio payload").unwrap();
    path
}

fn transcript_body() -> serde_json::Value {
    json!({
        "language": "en",
        "duration": 5.0,
        "text": "Hello world.",
        "segments": [
            {"start": 0.0, "end": 2.5, "text": " Hello world. "}
        ]
    })
}

#[tokio::test]
async fn test_successful_transcription_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transcript_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let client = WhisperClient::new("sk-test".to_string()).with_base_url(server.uri());

    let transcript = client.transcribe(&test_chunk(write_fake_audio(&dir))).await.unwrap();

    assert_eq!(transcript.language, "en");
    assert_eq!(transcript.duration, 5.0);
    assert_eq!(transcript.segments.len(), 1);
    assert_eq!(transcript.segments[0].start, 0.0);
    assert_eq!(transcript.segments[0].end, 2.5);
}

#[tokio::test]
async fn test_server_error_retried_then_succeeds() {
    let server = MockServer::start().await;

    // First attempt fails with a 503; the retry lands on the success mock
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transcript_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let client = WhisperClient::new("sk-test".to_string()).with_base_url(server.uri());

    let transcript = client.transcribe(&test_chunk(write_fake_audio(&dir))).await.unwrap();
    assert_eq!(transcript.text, "Hello world.");
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API key"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let client = WhisperClient::new("sk-bad".to_string()).with_base_url(server.uri());

    let result = client.transcribe(&test_chunk(write_fake_audio(&dir))).await;
    match result {
        Err(VelosubError::Api(msg)) => assert!(msg.contains("Invalid API key")),
        other => panic!("Expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_response_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "missing required fields"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let client = WhisperClient::new("sk-test".to_string()).with_base_url(server.uri());

    let result = client.transcribe(&test_chunk(write_fake_audio(&dir))).await;
    match result {
        Err(VelosubError::Api(msg)) => assert!(msg.contains("Malformed")),
        other => panic!("Expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_segment_timestamps_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "language": "en",
            "duration": 5.0,
            "text": "inverted",
            "segments": [{"start": 3.0, "end": 1.0, "text": "inverted"}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let client = WhisperClient::new("sk-test".to_string()).with_base_url(server.uri());

    let result = client.transcribe(&test_chunk(write_fake_audio(&dir))).await;
    assert!(matches!(result, Err(VelosubError::Api(_))));
}

#[tokio::test]
async fn test_oversized_chunk_rejected_without_upload() {
    let server = MockServer::start().await;
    // No request must reach the server
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transcript_body()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("huge.mp3");
    let payload = vec![0u8; 25 * 1024 * 1024];
    std::fs::write(&path, &payload).unwrap();

    let client = WhisperClient::new("sk-test".to_string()).with_base_url(server.uri());
    let result = client.transcribe(&test_chunk(path)).await;

    match result {
        Err(VelosubError::Transcription(msg)) => assert!(msg.contains("ceiling")),
        other => panic!("Expected transcription error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_chunk_file_fails() {
    let client = WhisperClient::new("sk-test".to_string());
    let result = client
        .transcribe(&test_chunk(PathBuf::from("/nonexistent/chunk.mp3")))
        .await;
    assert!(result.is_err());
}
