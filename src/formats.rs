//! Format resolution and media byte streams.
//!
//! Wraps the rusty_ytdl resolver: enumerate the downloadable formats of a
//! video, partition them for the info response, pick one by itag, and open
//! the byte stream behind its direct media URL.

use anyhow::{Context, Result, anyhow};
use rusty_ytdl::{RequestOptions, Video, VideoOptions};
use serde::Serialize;

/// Sent on every outbound request to the video platform. The upstream CDN
/// filters requests carrying default library user agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Whether the resolver recognizes the URL as one it can extract from.
/// Purely syntactic, no network involved.
pub fn accepts_url(url: &str) -> bool {
    Video::new(url).is_ok()
}

/// Client handle for the format resolver, built once at startup.
pub struct FormatClient {
    http: reqwest::Client,
}

impl FormatClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetches the format catalog for a watch URL. One upstream fetch per
    /// call, no caching; quality ladders change between requests.
    pub async fn resolve(&self, url: &str) -> Result<Vec<FormatDescriptor>> {
        let options = VideoOptions {
            request_options: RequestOptions {
                client: Some(self.http.clone()),
                ..Default::default()
            },
            ..Default::default()
        };
        let video = Video::new_with_options(url, options)
            .map_err(|err| anyhow!("initializing the format resolver: {err}"))?;
        let info = video
            .get_info()
            .await
            .map_err(|err| anyhow!("fetching the format catalog: {err}"))?;

        Ok(info
            .formats
            .iter()
            .map(FormatDescriptor::from_upstream)
            .collect())
    }

    /// Opens the byte stream behind a descriptor's direct URL. The response
    /// body is forwarded to the caller unmodified.
    pub async fn open_stream(&self, descriptor: &FormatDescriptor) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(&descriptor.url)
            .send()
            .await
            .context("requesting the media stream")?
            .error_for_status()
            .context("media host rejected the stream request")?;
        Ok(response)
    }
}

/// One downloadable variant of a video, serialized for the info response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    pub itag: u64,
    pub url: String,
    pub mime_type: String,
    pub container: String,
    pub quality: String,
    pub has_video: bool,
    pub has_audio: bool,
    pub is_live: bool,
    #[serde(rename = "isHLS")]
    pub is_hls: bool,
    #[serde(rename = "isDashMPD")]
    pub is_dash_mpd: bool,
}

impl FormatDescriptor {
    fn from_upstream(format: &rusty_ytdl::VideoFormat) -> Self {
        Self {
            itag: format.itag,
            url: format.url.clone(),
            mime_type: format.mime_type.mime.to_string(),
            container: format.mime_type.container.clone(),
            quality: format.quality.clone().unwrap_or_default(),
            has_video: format.has_video,
            has_audio: format.has_audio,
            is_live: format.is_live,
            is_hls: format.is_hls,
            is_dash_mpd: format.is_dash_mpd,
        }
    }
}

/// The two disjoint format lists served by the info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FormatLists {
    pub video: Vec<FormatDescriptor>,
    #[serde(rename = "audioOnly")]
    pub audio_only: Vec<FormatDescriptor>,
}

/// Splits a catalog into the served lists. `video` keeps muxed mp4 formats
/// only; `audioOnly` keeps audio-only mp4 and webm formats. Everything else
/// (video-only streams, other containers) is dropped from the response.
pub fn partition_formats(catalog: &[FormatDescriptor]) -> FormatLists {
    let video = catalog
        .iter()
        .filter(|format| format.has_video && format.has_audio && format.container == "mp4")
        .cloned()
        .collect();
    let audio_only = catalog
        .iter()
        .filter(|format| {
            !format.has_video
                && format.has_audio
                && (format.container == "mp4" || format.container == "webm")
        })
        .cloned()
        .collect();
    FormatLists { video, audio_only }
}

/// Finds the catalog entry with the exact requested itag.
pub fn find_format(catalog: &[FormatDescriptor], itag: u64) -> Option<&FormatDescriptor> {
    catalog.iter().find(|format| format.itag == itag)
}
