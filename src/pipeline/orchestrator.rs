use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::{CheckpointStore, StoreError, SubscriberDirectory};
use crate::extractor::{Opening, OpeningExtractor};
use crate::mailer::AlertMailer;
use crate::pipeline::report::{RunOutcome, RunReport};
use crate::youtube::{SourceError, VideoSource};

/// Failures that abort a run. The checkpoint is only written on the
/// paths that complete, so an aborted run retries the same window on the
/// next trigger.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("content source failure: {0}")]
    Source(#[from] SourceError),

    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

/// The ingestion-and-fan-out orchestrator.
///
/// One `run_once` per external trigger. Items and subscribers are
/// processed sequentially: both extraction and delivery are rate-limited
/// external calls, and sequential accumulation keeps reports and logs
/// deterministic. Overlapping triggers are assumed to be serialized by
/// the external scheduler; the checkpoint row is the only shared state.
pub struct Pipeline {
    source: Arc<dyn VideoSource>,
    extractor: Arc<dyn OpeningExtractor>,
    checkpoint: Arc<dyn CheckpointStore>,
    directory: Arc<dyn SubscriberDirectory>,
    mailer: Arc<dyn AlertMailer>,
    channel_id: String,
    max_videos: u32,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn VideoSource>,
        extractor: Arc<dyn OpeningExtractor>,
        checkpoint: Arc<dyn CheckpointStore>,
        directory: Arc<dyn SubscriberDirectory>,
        mailer: Arc<dyn AlertMailer>,
        channel_id: String,
        max_videos: u32,
    ) -> Self {
        Self {
            source,
            extractor,
            checkpoint,
            directory,
            mailer,
            channel_id,
            max_videos,
        }
    }

    /// Execute one full run: checkpoint read, bounded listing, per-item
    /// extraction, aggregation, per-subscriber dispatch, checkpoint write.
    ///
    /// Idempotent under repeated triggering: listing is bounded by the
    /// checkpoint and the checkpoint only ever moves forward to the max
    /// publish time of a listed batch.
    pub async fn run_once(&self) -> Result<RunReport, PipelineError> {
        let last_processed_at = self.checkpoint.load().await?;
        info!(
            channel_id = %self.channel_id,
            max_videos = self.max_videos,
            last_processed_at = ?last_processed_at,
            "Starting job alert run"
        );

        let videos = self
            .source
            .recent_videos(&self.channel_id, self.max_videos, last_processed_at)
            .await?;

        if videos.is_empty() {
            info!("No new videos since last run, checkpoint unchanged");
            return Ok(RunReport::zeroed(RunOutcome::NoNewVideos));
        }
        info!("Found {} new video(s)", videos.len());

        // Max publish time over the *listed* batch, fixed before any
        // per-item work: a video whose extraction degrades still counts
        // as processed and must never be listed again.
        let latest_published_at: DateTime<Utc> = videos
            .iter()
            .map(|v| v.published_at)
            .max()
            .unwrap_or(videos[0].published_at);

        let mut all_openings: Vec<Opening> = Vec::new();
        let mut videos_with_jobs = 0;

        for (i, video) in videos.iter().enumerate() {
            info!(
                "[{}/{}] Processing video {} ({})",
                i + 1,
                videos.len(),
                video.video_id,
                video.title
            );

            // Per-item failure isolation: a snippet fetch failure
            // degrades this one video to an empty extraction and the
            // loop moves on.
            let snippet = match self.source.video_snippet(&video.video_id).await {
                Ok(snippet) => snippet,
                Err(e) => {
                    warn!(
                        "Detail fetch failed for video {}, skipping extraction: {}",
                        video.video_id, e
                    );
                    continue;
                }
            };

            // A missing transcript is routine (no captions); extraction
            // proceeds on title and description alone.
            let transcript = match self.source.transcript(&video.video_id).await {
                Ok(transcript) => transcript,
                Err(e) => {
                    warn!(
                        "Transcript fetch failed for video {}, continuing without it: {}",
                        video.video_id, e
                    );
                    String::new()
                }
            };

            let extraction = self
                .extractor
                .extract(&snippet.title, &snippet.description, &transcript)
                .await;

            if extraction.has_openings() {
                info!(
                    "Video {} yielded {} opening(s)",
                    video.video_id,
                    extraction.openings.len()
                );
                videos_with_jobs += 1;
                all_openings.extend(extraction.openings);
            } else {
                info!("No openings in video {}", video.video_id);
            }
        }

        let jobs_extracted = all_openings.len();

        if all_openings.is_empty() {
            info!("No openings in any video, advancing checkpoint");
            self.checkpoint.save(latest_published_at).await?;
            return Ok(RunReport {
                outcome: RunOutcome::NoJobsFound,
                videos_processed: videos.len(),
                videos_with_jobs,
                jobs_extracted: 0,
                emails_sent: 0,
                emails_failed: 0,
            });
        }
        info!("Total openings extracted: {}", jobs_extracted);

        let subscribers = self.directory.list_all().await?;
        let active: Vec<_> = subscribers.into_iter().filter(|s| s.is_active()).collect();

        if active.is_empty() {
            info!("Openings found but no active subscribers, advancing checkpoint");
            self.checkpoint.save(latest_published_at).await?;
            return Ok(RunReport {
                outcome: RunOutcome::NoActiveSubscribers,
                videos_processed: videos.len(),
                videos_with_jobs,
                jobs_extracted,
                emails_sent: 0,
                emails_failed: 0,
            });
        }
        info!("Dispatching to {} active subscriber(s)", active.len());

        let mut emails_sent = 0;
        let mut emails_failed = 0;

        for (i, subscriber) in active.iter().enumerate() {
            if subscriber.email.trim().is_empty() {
                warn!("[{}/{}] Skipping subscriber with empty address", i + 1, active.len());
                emails_failed += 1;
                continue;
            }

            let token = match subscriber.unsubscribe_token.as_deref() {
                Some(token) if !token.is_empty() => token,
                _ => {
                    warn!(
                        "[{}/{}] Skipping {}: no unsubscribe token",
                        i + 1,
                        active.len(),
                        subscriber.email
                    );
                    emails_failed += 1;
                    continue;
                }
            };

            match self
                .mailer
                .send_job_alert(&subscriber.email, &all_openings, token)
                .await
            {
                Ok(()) => {
                    info!("[{}/{}] Sent to {}", i + 1, active.len(), subscriber.email);
                    emails_sent += 1;
                }
                Err(e) => {
                    error!(
                        "[{}/{}] Failed to send to {}: {}",
                        i + 1,
                        active.len(),
                        subscriber.email,
                        e
                    );
                    emails_failed += 1;
                }
            }
        }

        // Advancement is decoupled from delivery: a permanently failing
        // subscriber must not block future batches or cause content to
        // be reprocessed.
        self.checkpoint.save(latest_published_at).await?;

        info!(
            videos_processed = videos.len(),
            videos_with_jobs,
            jobs_extracted,
            emails_sent,
            emails_failed,
            "Run completed"
        );

        Ok(RunReport {
            outcome: RunOutcome::Completed,
            videos_processed: videos.len(),
            videos_with_jobs,
            jobs_extracted,
            emails_sent,
            emails_failed,
        })
    }
}
