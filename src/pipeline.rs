use crate::chunk::{self, ChunkAsset};
use crate::config::Config;
use crate::error::{Result, VelosubError};
use crate::media::{self, MediaAsset, MediaKind, OptimizationResult};
use crate::subtitle::{self, SubtitleDocument};
use crate::timeline::{reconcile, TimelineContext};
use crate::transcribe::{Transcriber, TranscriptionOrchestrator, WhisperClient};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Options supplied by the caller for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Skip the speed optimization pass (speed factor becomes 1.0).
    pub skip_optimization: bool,
    /// Global offset added to every output timestamp, in seconds.
    pub offset_seconds: f64,
    /// Explicit chunk length in minutes; forces chunking when set.
    pub chunk_minutes: Option<f64>,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            skip_optimization: false,
            offset_seconds: 0.0,
            chunk_minutes: None,
            show_progress: true,
        }
    }
}

/// Timing and volume numbers from one run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub transcription_time: Duration,
    pub chunks_processed: usize,
    pub cue_count: usize,
    /// Original-time duration of the transcribed audio, in seconds.
    pub audio_duration_secs: f64,
}

/// What the pipeline hands back to the shell.
#[derive(Debug)]
pub struct PipelineResult {
    pub output_path: PathBuf,
    pub text: String,
    pub language: String,
    pub duration_secs: f64,
    pub stats: PipelineStats,
}

/// Deletes every intermediate asset when dropped, on every exit path.
struct TempCleanupGuard {
    temp_dir: TempDir,
    cancelled: Arc<AtomicBool>,
}

impl TempCleanupGuard {
    fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Drop for TempCleanupGuard {
    fn drop(&mut self) {
        if self.cancelled.load(Ordering::Relaxed) {
            warn!(
                "Run aborted, cleaning up temp files: {:?}",
                self.temp_dir.path()
            );
        } else {
            debug!("Cleaning up temp directory: {:?}", self.temp_dir.path());
        }
        // TempDir deletes its contents on drop
    }
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(VelosubError::Transcription("Run cancelled".to_string()));
    }
    Ok(())
}

fn stage_spinner(mp: Option<&MultiProgress>, msg: &str) -> Option<ProgressBar> {
    mp.map(|mp| {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    })
}

/// Generate an SRT subtitle file from a video or audio file.
///
/// Stages: probe, extract (video only), speed-optimize, plan, split,
/// transcribe chunks, reconcile timelines, serialize. All intermediate
/// files live in one temp directory and are deleted whichever way the run
/// ends; the user's input file is never touched.
pub async fn generate_subtitles(
    input: &Path,
    output: &Path,
    config: &Config,
    options: PipelineOptions,
) -> Result<PipelineResult> {
    let cancelled = Arc::new(AtomicBool::new(false));
    generate_subtitles_with_cancel(input, output, config, options, cancelled).await
}

/// Generate subtitles with cancellation support. The flag is checked
/// between stages; cleanup runs regardless.
pub async fn generate_subtitles_with_cancel(
    input: &Path,
    output: &Path,
    config: &Config,
    options: PipelineOptions,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    if !input.exists() {
        return Err(VelosubError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input file not found: {}", input.display()),
        )));
    }

    let kind = media::classify_input(input)?;
    media::check_ffmpeg()?;
    media::check_ffprobe()?;

    let guard = TempCleanupGuard {
        temp_dir: TempDir::new().map_err(|e| {
            VelosubError::Io(std::io::Error::other(format!(
                "Failed to create temp directory: {e}"
            )))
        })?,
        cancelled: cancelled.clone(),
    };
    let temp_path = guard.path();
    debug!("Using temp directory: {:?}", temp_path);

    let multi_progress = if options.show_progress {
        Some(MultiProgress::new())
    } else {
        None
    };

    check_cancelled(&cancelled)?;

    // Stage 1: probe, and extract the audio track if the input is video
    info!("Stage 1/5: Probing {:?}", input);
    let source = MediaAsset::probe(input)?;
    info!("Input duration: {:.1}s", source.duration_secs);

    let audio = match kind {
        MediaKind::Audio => source,
        MediaKind::Video => {
            let pb = stage_spinner(multi_progress.as_ref(), "Extracting audio...");
            let audio_path = temp_path.join("audio.mp3");
            let asset = media::extract_audio(input, &audio_path)?;
            if let Some(pb) = pb {
                pb.finish_with_message(format!("✓ Audio extracted ({:.1}s)", asset.duration_secs));
            }
            asset
        }
    };

    check_cancelled(&cancelled)?;

    // Stage 2: speed optimization
    info!("Stage 2/5: Speed optimization");
    let optimized: OptimizationResult = if options.skip_optimization {
        debug!("Speed optimization skipped");
        OptimizationResult::unmodified(audio)
    } else {
        let pb = stage_spinner(multi_progress.as_ref(), "Optimizing audio speed...");
        let result = media::optimize(&audio, &temp_path.join("optimized.mp3"), config.speed_factor)?;
        if let Some(pb) = pb {
            pb.finish_with_message(format!(
                "✓ Audio optimized at {:.2}x ({:.1}s)",
                result.speed_factor, result.asset.duration_secs
            ));
        }
        result
    };

    check_cancelled(&cancelled)?;

    // Stage 3: chunk planning and splitting
    info!("Stage 3/5: Chunk planning");
    let plan = chunk::plan(
        &optimized.asset,
        optimized.speed_factor,
        options.chunk_minutes,
    )?;

    let chunks: Vec<ChunkAsset> = if plan.should_chunk {
        let pb = stage_spinner(multi_progress.as_ref(), "Splitting audio into chunks...");
        let chunks = chunk::split(&optimized.asset, plan.chunk_secs_optimized, &temp_path.join("chunks"))?;
        if let Some(pb) = pb {
            pb.finish_with_message(format!("✓ Created {} audio chunks", chunks.len()));
        }
        chunks
    } else {
        vec![ChunkAsset {
            asset: optimized.asset.clone(),
            index: 0,
        }]
    };

    check_cancelled(&cancelled)?;

    // Stage 4: transcription
    info!("Stage 4/5: Transcribing {} chunk(s)", chunks.len());
    let transcription_start = Instant::now();

    let api_key = config.api_key.clone().ok_or_else(|| {
        VelosubError::Config(
            "API key not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
        )
    })?;
    let mut client = WhisperClient::new(api_key);
    if let Some(ref base_url) = config.api_base_url {
        client = client.with_base_url(base_url.clone());
    }
    let transcriber: Box<dyn Transcriber> = Box::new(client);

    let orchestrator = TranscriptionOrchestrator::new(transcriber, config.concurrency)
        .with_progress(options.show_progress);
    let chunk_count = chunks.len();
    let chunk_transcripts = orchestrator.process_chunks(chunks).await?;

    let transcription_time = transcription_start.elapsed();
    info!(
        "Transcription complete in {:.2}s",
        transcription_time.as_secs_f64()
    );

    check_cancelled(&cancelled)?;

    // Stage 5: timeline reconciliation and serialization
    info!("Stage 5/5: Reconciling timeline and writing subtitles");
    let ctx = TimelineContext {
        speed_factor: optimized.speed_factor,
        user_offset_secs: options.offset_seconds,
    };
    let transcript = reconcile(&chunk_transcripts, &ctx);

    let document = SubtitleDocument::from_transcript(&transcript);
    let rendered = subtitle::render(&document);
    fs::write(output, &rendered)?;

    info!("Wrote {} cues to {:?}", document.cues.len(), output);

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        transcription_time,
        chunks_processed: chunk_count,
        cue_count: document.cues.len(),
        audio_duration_secs: transcript.duration.as_secs_f64(),
    };

    Ok(PipelineResult {
        output_path: output.to_path_buf(),
        text: transcript.text,
        language: transcript.language,
        duration_secs: transcript.duration.as_secs_f64(),
        stats,
    })
}

/// Print a human-readable summary of the run.
pub fn print_summary(result: &PipelineResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                  Subtitle Generation Complete                  ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", result.output_path.display());
    println!("  Cues:       {}", result.stats.cue_count);
    println!("  Language:   {}", result.language);
    println!("  Duration:   {:.1}s audio", result.duration_secs);
    println!();
    println!("  Timing:");
    println!(
        "    Transcribe:  {:.2}s ({} chunks)",
        result.stats.transcription_time.as_secs_f64(),
        result.stats.chunks_processed
    );
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_options_default() {
        let options = PipelineOptions::default();
        assert!(!options.skip_optimization);
        assert_eq!(options.offset_seconds, 0.0);
        assert!(options.chunk_minutes.is_none());
        assert!(options.show_progress);
    }

    #[test]
    fn test_check_cancelled() {
        let flag = AtomicBool::new(false);
        assert!(check_cancelled(&flag).is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(check_cancelled(&flag).is_err());
    }

    #[tokio::test]
    async fn test_missing_input_rejected() {
        let config = Config {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let result = generate_subtitles(
            Path::new("/nonexistent/video.mp4"),
            Path::new("/tmp/out.srt"),
            &config,
            PipelineOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(VelosubError::Io(_))));
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected_before_external_calls() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.txt");
        fs::write(&input, "not media").unwrap();

        let config = Config {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let result = generate_subtitles(
            &input,
            Path::new("/tmp/out.srt"),
            &config,
            PipelineOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(VelosubError::UnsupportedFormat(_))));
    }
}
