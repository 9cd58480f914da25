//! Input parsing for the tubefetch backend.
//!
//! Handles turning user-supplied YouTube URLs (or bare video IDs) into
//! canonical video identifiers, and decoding the ISO-8601 durations the
//! metadata service reports.

use lazy_static::lazy_static;
use regex::Regex;

/// Extracts the canonical video ID from a YouTube URL.
///
/// The recognized URL shapes are tried in a fixed order: watch, short-link,
/// embed, legacy `/v/`, shorts. When none of them match, an input that is
/// already a bare 11-character ID is accepted as-is. Returns `None` for
/// anything else.
pub fn extract_video_id(input: &str) -> Option<String> {
    lazy_static! {
        // First capture group is always the video ID.
        static ref URL_PATTERNS: [Regex; 5] = [
            Regex::new(r"(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([^&\s]+)").unwrap(),
            Regex::new(r"(?:https?://)?youtu\.be/([^?\s]+)").unwrap(),
            Regex::new(r"(?:https?://)?(?:www\.)?youtube\.com/embed/([^?\s]+)").unwrap(),
            Regex::new(r"(?:https?://)?(?:www\.)?youtube\.com/v/([^?\s]+)").unwrap(),
            Regex::new(r"(?:https?://)?(?:www\.)?youtube\.com/shorts/([^?\s]+)").unwrap(),
        ];
        static ref BARE_ID: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
    }

    for pattern in URL_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(input) {
            if let Some(id) = captures.get(1) {
                return Some(id.as_str().to_string());
            }
        }
    }

    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }

    None
}

/// Canonical watch URL for a video ID, the form upstream services accept.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Decodes an ISO-8601 `PT#H#M#S` duration into total seconds.
///
/// Missing components count as zero, and malformed or empty input decodes
/// to zero rather than an error. Oversized components saturate instead of
/// wrapping.
pub fn parse_duration_seconds(duration: &str) -> u64 {
    lazy_static! {
        static ref DURATION: Regex = Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").unwrap();
    }

    let captures = match DURATION.captures(duration) {
        Some(captures) => captures,
        None => return 0,
    };
    let component = |index: usize| -> u64 {
        captures
            .get(index)
            .and_then(|value| value.as_str().parse().ok())
            .unwrap_or(0)
    };

    component(1)
        .saturating_mul(3600)
        .saturating_add(component(2).saturating_mul(60))
        .saturating_add(component(3))
}
