use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tubefetch::{
    config,
    formats::{self, FormatClient},
    metadata::{MetadataClient, VideoMetadata},
    parse,
};

#[derive(Clone)]
struct AppState {
    metadata: Arc<MetadataClient>,
    formats: Arc<FormatClient>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            details: None,
        }
    }

    fn upstream(message: impl Into<String>, source: impl std::fmt::Display) -> Self {
        let message = message.into();
        let details = format!("{source:#}");
        eprintln!("{message} {details}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
            details: Some(details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        let body = match self.details {
            Some(details) => serde_json::json!({
                "error": self.message,
                "details": details,
            }),
            None => serde_json::json!({
                "error": self.message,
            }),
        };
        (self.status, headers, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
struct InfoQuery {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DownloadQuery {
    url: Option<String>,
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    itag: Option<String>,
    filename: Option<String>,
}

#[derive(Debug)]
struct DownloadRequest {
    video_id: String,
    itag: u64,
    filename: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;
    let addr = SocketAddr::new(
        config.host.parse().context("parsing the bind host")?,
        config.port,
    );

    let http = reqwest::Client::builder()
        .user_agent(formats::BROWSER_USER_AGENT)
        .build()
        .context("building the upstream HTTP client")?;

    let state = AppState {
        metadata: Arc::new(MetadataClient::new(http.clone(), config.api_key)),
        formats: Arc::new(FormatClient::new(http)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/video-info", get(video_info))
        .route("/api/download", get(download))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    println!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        eprintln!("Failed to install Ctrl+C handler: {}", err);
    }
}

async fn video_info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> ApiResult<Json<VideoMetadata>> {
    let video_id = resolve_info_target(&query)?;

    let item = state
        .metadata
        .lookup(&video_id)
        .await
        .map_err(|err| ApiError::upstream("Failed to fetch video information.", &err))?
        .ok_or_else(|| ApiError::not_found("Video not found or access denied by YouTube API."))?;

    let catalog = state
        .formats
        .resolve(&parse::watch_url(&video_id))
        .await
        .map_err(|err| ApiError::upstream("Failed to fetch video information.", &err))?;

    let lists = formats::partition_formats(&catalog);
    Ok(Json(VideoMetadata::from_item(video_id, item, lists)))
}

async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let request = validate_download_query(&query)?;
    let watch_url = parse::watch_url(&request.video_id);

    if !formats::accepts_url(&watch_url) {
        return Err(ApiError::bad_request(
            "Invalid or unsupported YouTube URL according to ytdl-core",
        ));
    }

    let catalog = state
        .formats
        .resolve(&watch_url)
        .await
        .map_err(|err| ApiError::upstream("Failed to download video.", &err))?;

    let descriptor = formats::find_format(&catalog, request.itag).ok_or_else(|| {
        ApiError::not_found(format!(
            "Format with itag {} not found for this video.",
            request.itag
        ))
    })?;

    let media = state
        .formats
        .open_stream(descriptor)
        .await
        .map_err(|err| ApiError::upstream("Failed to download video.", &err))?;

    let content_type = if descriptor.mime_type.is_empty() {
        "application/octet-stream"
    } else {
        descriptor.mime_type.as_str()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&request.filename),
        )
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(Body::from_stream(media.bytes_stream()))
        .map_err(|err| ApiError::upstream("Failed to download video.", &err))
}

fn resolve_info_target(query: &InfoQuery) -> ApiResult<String> {
    let url = query
        .url
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL parameter is required"))?;
    parse::extract_video_id(url)
        .ok_or_else(|| ApiError::bad_request("Invalid YouTube URL or unable to extract Video ID"))
}

// Presence checks run in a fixed order before the target is inspected.
fn validate_download_query(query: &DownloadQuery) -> ApiResult<DownloadRequest> {
    let target = [query.url.as_deref(), query.video_id.as_deref()]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL or video ID parameter is required"))?;
    let itag = query
        .itag
        .as_deref()
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|itag| *itag != 0)
        .ok_or_else(|| ApiError::bad_request("itag parameter is required"))?;
    let filename = query
        .filename
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request("filename parameter is required"))?;
    let video_id = parse::extract_video_id(target)
        .ok_or_else(|| ApiError::bad_request("Invalid YouTube URL or Video ID provided"))?;

    Ok(DownloadRequest {
        video_id,
        itag,
        filename: filename.to_string(),
    })
}

// Both the plain and the RFC 5987 filename parameters carry the
// percent-encoded name.
fn content_disposition(filename: &str) -> String {
    let encoded = urlencoding::encode(filename);
    format!("attachment; filename=\"{encoded}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_requires_url_parameter() {
        let err = resolve_info_target(&InfoQuery::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "URL parameter is required");

        let err = resolve_info_target(&InfoQuery {
            url: Some(String::new()),
        })
        .unwrap_err();
        assert_eq!(err.message, "URL parameter is required");
    }

    #[test]
    fn info_rejects_unextractable_url() {
        let query = InfoQuery {
            url: Some("https://example.com/clip".to_string()),
        };
        let err = resolve_info_target(&query).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid YouTube URL or unable to extract Video ID");
    }

    #[test]
    fn info_extracts_id_from_watch_url() {
        let query = InfoQuery {
            url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
        };
        assert_eq!(resolve_info_target(&query).unwrap(), "dQw4w9WgXcQ");
    }

    #[test]
    fn download_reports_missing_parameters_in_order() {
        let err = validate_download_query(&DownloadQuery::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "URL or video ID parameter is required");

        let query = DownloadQuery {
            url: Some("https://youtu.be/dQw4w9WgXcQ".to_string()),
            ..Default::default()
        };
        let err = validate_download_query(&query).unwrap_err();
        assert_eq!(err.message, "itag parameter is required");

        let query = DownloadQuery {
            url: Some("https://youtu.be/dQw4w9WgXcQ".to_string()),
            itag: Some("18".to_string()),
            ..Default::default()
        };
        let err = validate_download_query(&query).unwrap_err();
        assert_eq!(err.message, "filename parameter is required");
    }

    #[test]
    fn download_rejects_non_numeric_and_zero_itag() {
        for bad in ["abc", "0", "-3", "1.5", ""] {
            let query = DownloadQuery {
                url: Some("https://youtu.be/dQw4w9WgXcQ".to_string()),
                itag: Some(bad.to_string()),
                filename: Some("clip.mp4".to_string()),
                ..Default::default()
            };
            let err = validate_download_query(&query).unwrap_err();
            assert_eq!(err.message, "itag parameter is required", "itag {bad:?}");
        }
    }

    #[test]
    fn download_rejects_unextractable_target() {
        let query = DownloadQuery {
            url: Some("https://example.com/nope".to_string()),
            itag: Some("18".to_string()),
            filename: Some("clip.mp4".to_string()),
            ..Default::default()
        };
        let err = validate_download_query(&query).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid YouTube URL or Video ID provided");
    }

    #[test]
    fn download_accepts_bare_video_id() {
        let query = DownloadQuery {
            video_id: Some("dQw4w9WgXcQ".to_string()),
            itag: Some("140".to_string()),
            filename: Some("audio.m4a".to_string()),
            ..Default::default()
        };
        let request = validate_download_query(&query).unwrap();
        assert_eq!(request.video_id, "dQw4w9WgXcQ");
        assert_eq!(request.itag, 140);
        assert_eq!(request.filename, "audio.m4a");
    }

    #[test]
    fn download_prefers_url_over_video_id() {
        let query = DownloadQuery {
            url: Some("https://youtu.be/dQw4w9WgXcQ".to_string()),
            video_id: Some("AAAAAAAAAAA".to_string()),
            itag: Some("18".to_string()),
            filename: Some("clip.mp4".to_string()),
        };
        let request = validate_download_query(&query).unwrap();
        assert_eq!(request.video_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn download_empty_url_falls_through_to_video_id() {
        let query = DownloadQuery {
            url: Some(String::new()),
            video_id: Some("dQw4w9WgXcQ".to_string()),
            itag: Some("18".to_string()),
            filename: Some("clip.mp4".to_string()),
        };
        let request = validate_download_query(&query).unwrap();
        assert_eq!(request.video_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn disposition_encodes_both_filename_parameters() {
        assert_eq!(
            content_disposition("my video.mp4"),
            "attachment; filename=\"my%20video.mp4\"; filename*=UTF-8''my%20video.mp4"
        );
    }

    #[test]
    fn disposition_percent_encodes_unicode() {
        assert_eq!(
            content_disposition("vidéo.mp4"),
            "attachment; filename=\"vid%C3%A9o.mp4\"; filename*=UTF-8''vid%C3%A9o.mp4"
        );
    }

    #[tokio::test]
    async fn error_body_carries_details_only_for_upstream_failures() {
        let response =
            ApiError::upstream("Failed to download video.", "socket closed").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Failed to download video.");
        assert_eq!(body["details"], "socket closed");

        let response = ApiError::bad_request("URL parameter is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "URL parameter is required");
        assert!(body.get("details").is_none());
    }
}
