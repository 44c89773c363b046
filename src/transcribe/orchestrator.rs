use crate::chunk::ChunkAsset;
use crate::error::{Result, VelosubError};
use crate::timeline::ChunkTranscript;
use crate::transcribe::Transcriber;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Runs per-chunk transcription on a bounded worker pool.
///
/// Chunk uploads are independent, so they run concurrently up to the limit;
/// completions arrive in any order and are re-keyed by chunk index so the
/// reconciler always consumes them in split order.
pub struct TranscriptionOrchestrator {
    transcriber: Arc<dyn Transcriber>,
    concurrency: usize,
    show_progress: bool,
}

impl TranscriptionOrchestrator {
    pub fn new(transcriber: Box<dyn Transcriber>, concurrency: usize) -> Self {
        Self {
            transcriber: Arc::from(transcriber),
            concurrency: concurrency.max(1),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Transcribe all chunks and return their transcripts in index order.
    ///
    /// Any chunk failure fails the whole run: a silently missing chunk would
    /// leave a hole in the reconciled timeline's text.
    pub async fn process_chunks(&self, chunks: Vec<ChunkAsset>) -> Result<Vec<ChunkTranscript>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let total_chunks = chunks.len();
        let start_time = Instant::now();

        info!(
            "Transcribing {} chunks with {} concurrent requests via {}",
            total_chunks,
            self.concurrency,
            self.transcriber.name()
        );

        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(total_chunks as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut futures = FuturesUnordered::new();

        for chunk in chunks {
            let sem = semaphore.clone();
            let transcriber = self.transcriber.clone();
            let pb = progress_bar.clone();

            futures.push(async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|_| VelosubError::Transcription("Worker pool closed".to_string()))?;

                let index = chunk.index;
                debug!("Starting transcription of chunk {}", index);

                let transcript = transcriber.transcribe(&chunk).await.map_err(|e| {
                    VelosubError::Transcription(format!("Chunk {index} failed: {e}"))
                })?;

                if let Some(ref pb) = pb {
                    pb.inc(1);
                }

                Ok::<ChunkTranscript, VelosubError>(ChunkTranscript {
                    index,
                    duration_secs: chunk.duration_secs(),
                    transcript,
                })
            });
        }

        // Index-keyed completion buffer: drain out-of-order completions,
        // then restore split order.
        let mut results: Vec<ChunkTranscript> = Vec::with_capacity(total_chunks);
        while let Some(result) = futures.next().await {
            results.push(result?);
        }
        results.sort_by_key(|r| r.index);

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Transcription complete");
        }

        info!(
            "Transcribed {} chunks in {:.2}s",
            total_chunks,
            start_time.elapsed().as_secs_f64()
        );

        Ok(results)
    }
}
