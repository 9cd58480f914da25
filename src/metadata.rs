//! Metadata lookup for the tubefetch backend.
//!
//! A thin typed client over the YouTube Data API v3 `videos` endpoint, plus
//! the response payload the backend assembles from it. The wire structs only
//! name the fields the backend reads; everything else in the upstream
//! response is ignored.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::formats::FormatLists;
use crate::parse::parse_duration_seconds;

const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Client handle for the metadata service, built once at startup.
pub struct MetadataClient {
    http: reqwest::Client,
    api_key: String,
}

impl MetadataClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }

    /// Looks up a video by ID. `Ok(None)` means the service answered but
    /// knows no such video; `Err` means the call itself failed.
    pub async fn lookup(&self, video_id: &str) -> Result<Option<VideoItem>> {
        let response = self
            .http
            .get(VIDEOS_ENDPOINT)
            .query(&[
                ("part", "snippet,contentDetails,statistics"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("querying the video metadata service")?
            .error_for_status()
            .context("metadata service rejected the request")?;

        let mut data: VideoListResponse = response
            .json()
            .await
            .context("decoding the metadata service response")?;

        if data.items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(data.items.remove(0)))
        }
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

/// One video record as returned by the metadata service. All parts are
/// optional; the service omits whole sections for some videos.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub snippet: Option<Snippet>,
    pub content_details: Option<ContentDetails>,
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub published_at: Option<DateTime<Utc>>,
    pub channel_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    pub channel_title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub live_broadcast_content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub maxres: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDetails {
    pub duration: Option<String>,
}

/// View and like counts arrive as decimal strings, not numbers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
}

/// Response payload of the video-info endpoint.
///
/// Optional fields are dropped from the JSON entirely when absent instead of
/// serializing as null.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub uploader: String,
    pub duration: u64,
    pub view_count: u64,
    pub like_count: u64,
    pub upload_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_broadcast_content: Option<String>,
    pub ytdl_formats: FormatLists,
}

impl VideoMetadata {
    /// Assembles the response from an upstream record and the partitioned
    /// format lists. Missing upstream fields fall back to fixed defaults:
    /// "Unknown Title", "Unknown" uploader, empty thumbnail, zero counts.
    pub fn from_item(video_id: impl Into<String>, item: VideoItem, formats: FormatLists) -> Self {
        let snippet = item.snippet.unwrap_or_default();
        let statistics = item.statistics.unwrap_or_default();
        let duration = item
            .content_details
            .and_then(|details| details.duration)
            .unwrap_or_default();

        Self {
            video_id: video_id.into(),
            title: snippet.title.unwrap_or_else(|| "Unknown Title".to_string()),
            description: snippet.description.unwrap_or_default(),
            thumbnail: best_thumbnail(&snippet.thumbnails),
            uploader: snippet
                .channel_title
                .unwrap_or_else(|| "Unknown".to_string()),
            duration: parse_duration_seconds(&duration),
            view_count: parse_count(statistics.view_count.as_deref()),
            like_count: parse_count(statistics.like_count.as_deref()),
            upload_date: snippet
                .published_at
                .map(|published| published.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            channel_id: snippet.channel_id,
            tags: snippet.tags,
            live_broadcast_content: snippet.live_broadcast_content,
            ytdl_formats: formats,
        }
    }
}

// Resolution priority: maxres, then high, then medium. Anything lower maps
// to an empty string, same as a fully absent set.
fn best_thumbnail(thumbnails: &Thumbnails) -> String {
    thumbnails
        .maxres
        .as_ref()
        .or(thumbnails.high.as_ref())
        .or(thumbnails.medium.as_ref())
        .map(|thumbnail| thumbnail.url.clone())
        .unwrap_or_default()
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.parse().ok()).unwrap_or(0)
}
