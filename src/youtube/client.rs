use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{SourceError, VideoItem, VideoSnippet, VideoSource};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

/// YouTube Data API v3 client. Transcripts come from the public
/// timedtext caption endpoint, which returns empty for videos without
/// captions.
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

/// Wire format of the search listing (only the fields we read).
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoListItem>,
}

#[derive(Debug, Deserialize)]
struct VideoListItem {
    snippet: Snippet,
}

/// Convert the raw search payload into listing order: non-video results
/// dropped, strictly newer than the lower bound, oldest first.
///
/// The API treats `publishedAfter` as inclusive, so without the strict
/// filter the newest already-processed video would be listed again on
/// every run.
fn into_listing(response: SearchResponse, published_after: Option<DateTime<Utc>>) -> Vec<VideoItem> {
    let mut videos: Vec<VideoItem> = response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            Some(VideoItem {
                video_id,
                title: item.snippet.title,
                description: item.snippet.description,
                published_at: item.snippet.published_at,
            })
        })
        .filter(|v| match published_after {
            Some(after) => v.published_at > after,
            None => true,
        })
        .collect();

    videos.sort_by_key(|v| v.published_at);
    videos
}

/// Flatten timedtext caption XML into plain text.
///
/// The payload is a flat `<transcript><text ...>...</text>...` document;
/// tags are dropped and the common XML entities decoded.
fn transcript_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut in_tag = false;

    for ch in xml.chars() {
        match ch {
            '<' => {
                in_tag = true;
                if !out.ends_with(' ') && !out.is_empty() {
                    out.push(' ');
                }
            }
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }

    let decoded = out
        .replace("&amp;#39;", "'")
        .replace("&#39;", "'")
        .replace("&amp;quot;", "\"")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn recent_videos(
        &self,
        channel_id: &str,
        max_results: u32,
        published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<VideoItem>, SourceError> {
        let mut query: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("channelId", channel_id.to_string()),
            ("part", "snippet".to_string()),
            ("order", "date".to_string()),
            ("type", "video".to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(after) = published_after {
            query.push(("publishedAfter", after.to_rfc3339()));
        }

        let response: SearchResponse = self
            .http
            .get(SEARCH_URL)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let videos = into_listing(response, published_after);
        debug!("Listing returned {} video(s) for channel {}", videos.len(), channel_id);
        Ok(videos)
    }

    async fn video_snippet(&self, video_id: &str) -> Result<VideoSnippet, SourceError> {
        let response: VideoListResponse = self
            .http
            .get(VIDEOS_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("part", "snippet"),
                ("id", video_id),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Api(format!("video {} not found", video_id)))?;

        Ok(VideoSnippet {
            title: item.snippet.title,
            description: item.snippet.description,
        })
    }

    async fn transcript(&self, video_id: &str) -> Result<String, SourceError> {
        let body = self
            .http
            .get(TIMEDTEXT_URL)
            .query(&[("lang", "en"), ("v", video_id)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if body.trim().is_empty() {
            warn!("No captions available for video {}", video_id);
            return Ok(String::new());
        }

        Ok(transcript_text(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn search_payload() -> SearchResponse {
        serde_json::from_value(serde_json::json!({
            "items": [
                {
                    "id": { "kind": "youtube#video", "videoId": "vid-new" },
                    "snippet": {
                        "title": "Newest video",
                        "description": "desc",
                        "publishedAt": "2024-03-03T10:00:00Z"
                    }
                },
                {
                    "id": { "kind": "youtube#video", "videoId": "vid-mid" },
                    "snippet": {
                        "title": "Middle video",
                        "description": "desc",
                        "publishedAt": "2024-03-02T10:00:00Z"
                    }
                },
                {
                    "id": { "kind": "youtube#playlist" },
                    "snippet": {
                        "title": "A playlist, not a video",
                        "description": "",
                        "publishedAt": "2024-03-02T12:00:00Z"
                    }
                },
                {
                    "id": { "kind": "youtube#video", "videoId": "vid-old" },
                    "snippet": {
                        "title": "Oldest video",
                        "description": "desc",
                        "publishedAt": "2024-03-01T10:00:00Z"
                    }
                }
            ]
        }))
        .expect("payload should deserialize")
    }

    #[test]
    fn listing_sorts_oldest_first_and_drops_non_videos() {
        let videos = into_listing(search_payload(), None);

        let ids: Vec<&str> = videos.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(ids, vec!["vid-old", "vid-mid", "vid-new"]);
    }

    #[test]
    fn listing_filter_is_strict() {
        // Lower bound equal to vid-old's publish time: vid-old must not
        // be listed again.
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let videos = into_listing(search_payload(), Some(after));

        let ids: Vec<&str> = videos.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(ids, vec!["vid-mid", "vid-new"]);
    }

    #[test]
    fn listing_is_deterministic() {
        let first = into_listing(search_payload(), None);
        let second = into_listing(search_payload(), None);

        let a: Vec<&str> = first.iter().map(|v| v.video_id.as_str()).collect();
        let b: Vec<&str> = second.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn transcript_text_strips_tags_and_entities() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<transcript><text start="0.0" dur="2.5">we&#39;re hiring</text><text start="2.5" dur="3.1">apply at example.com &amp; good luck</text></transcript>"#;

        assert_eq!(
            transcript_text(xml),
            "we're hiring apply at example.com & good luck"
        );
    }
}
