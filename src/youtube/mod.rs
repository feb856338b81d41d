pub mod client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// One video as returned by the listing query. Immutable once listed;
/// identity is the video id.
#[derive(Debug, Clone)]
pub struct VideoItem {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
}

/// Full title and description from the per-video detail fetch.
/// The search listing truncates descriptions, so extraction uses this.
#[derive(Debug, Clone)]
pub struct VideoSnippet {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from video source: {0}")]
    Api(String),
}

/// Listing and per-item fetch operations against the content source.
///
/// `recent_videos` must be free of side effects: listing twice with the
/// same bounds returns the same items.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// List up to `max_results` videos for a channel, oldest first,
    /// strictly newer than `published_after` when given.
    async fn recent_videos(
        &self,
        channel_id: &str,
        max_results: u32,
        published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<VideoItem>, SourceError>;

    /// Fetch the full title and description for one video.
    async fn video_snippet(&self, video_id: &str) -> Result<VideoSnippet, SourceError>;

    /// Fetch the spoken transcript for one video. May legitimately return
    /// an empty string when no captions exist.
    async fn transcript(&self, video_id: &str) -> Result<String, SourceError>;
}
