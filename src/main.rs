use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use velosub::config::Config;
use velosub::pipeline::{generate_subtitles_with_cancel, print_summary, PipelineOptions};

#[derive(Parser)]
#[command(name = "velosub")]
#[command(version, about = "Chunked subtitle generation for long media files")]
#[command(
    long_about = "Generate SRT subtitles from video/audio files of any length. Long inputs are \
speed-optimized, split into API-sized chunks, transcribed remotely, and stitched back onto the \
original timeline."
)]
struct Cli {
    /// Input video/audio file
    input: PathBuf,

    /// Output subtitle file (defaults to input name with .srt extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable the speed optimization pass before upload
    #[arg(long)]
    no_speedup: bool,

    /// Global offset added to every subtitle timestamp, in seconds
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    offset: f64,

    /// Explicit chunk length in minutes (forces chunking)
    #[arg(long)]
    chunk_minutes: Option<f64>,

    /// Number of concurrent transcription requests
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}.srt", stem.to_string_lossy()));
    output
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let output = cli.output.unwrap_or_else(|| derive_output_path(&cli.input));

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    config.validate().context("Configuration validation failed")?;

    info!("Input:    {}", cli.input.display());
    info!("Output:   {}", output.display());
    if cli.no_speedup {
        info!("Speedup:  disabled");
    } else {
        info!("Speedup:  {:.2}x", config.speed_factor);
    }
    if cli.offset != 0.0 {
        info!("Offset:   {:+.3}s", cli.offset);
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let ctrlc_flag = cancelled.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, cleaning up...");
        ctrlc_flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl+C handler")?;

    let options = PipelineOptions {
        skip_optimization: cli.no_speedup,
        offset_seconds: cli.offset,
        chunk_minutes: cli.chunk_minutes,
        show_progress: true,
    };

    let result = generate_subtitles_with_cancel(&cli.input, &output, &config, options, cancelled)
        .await
        .context("Subtitle generation failed")?;

    print_summary(&result);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_path() {
        let input = PathBuf::from("/path/to/video.mp4");
        assert_eq!(derive_output_path(&input), PathBuf::from("/path/to/video.srt"));
    }

    #[test]
    fn test_derive_output_path_audio_input() {
        let input = PathBuf::from("podcast.mp3");
        assert_eq!(derive_output_path(&input), PathBuf::from("podcast.srt"));
    }
}
