use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, TranscriptError};

/// Marker preceding the caption track container in the watch page
const CAPTIONS_MARKER: &str = "\"captions\":";

/// Marker present on any playable (or at least renderable) watch page
const PLAYABILITY_MARKER: &str = "\"playabilityStatus\":";

/// Marker of the automated-access challenge interstitial
const CHALLENGE_MARKER: &str = "class=\"g-recaptcha\"";

/// Marker preceding the full player response object
const PLAYER_RESPONSE_MARKER: &str = "var ytInitialPlayerResponse = ";

/// Descriptive fields recovered from the watch page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub channel_id: String,
    pub length_seconds: u64,
    pub view_count: u64,
    pub is_private: bool,
    pub is_live_content: bool,
    pub publish_date: Option<String>,
    pub category: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Extract the JSON object following `marker`, using a balanced-brace scan.
///
/// Splitting on a secondary marker breaks whenever upstream reorders fields,
/// so the end of the object is found structurally instead: track brace depth
/// while skipping string literals and their escapes.
pub fn extract_json_after_marker<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let start = html.find(marker)? + marker.len();
    let rest = &html[start..];
    let open = rest.find(|c: char| !c.is_whitespace())?;
    if rest.as_bytes()[open] != b'{' {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in rest.bytes().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[open..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Classify the page and return the caption track container on success.
///
/// The challenge marker is checked before anything else: a challenge page and
/// an unavailable-video page both lack the caption marker, and misreading a
/// block as a missing video would hide the actual problem from the caller.
pub fn captions_renderer(html: &str, video_id: &str) -> Result<Value> {
    if !html.contains(CAPTIONS_MARKER) {
        if html.contains(CHALLENGE_MARKER) {
            return Err(TranscriptError::IpBlocked(video_id.to_string()).into());
        }
        if !html.contains(PLAYABILITY_MARKER) {
            return Err(TranscriptError::VideoUnavailable(video_id.to_string()).into());
        }
        return Err(TranscriptError::TranscriptsDisabled(video_id.to_string()).into());
    }

    let disabled = || TranscriptError::TranscriptsDisabled(video_id.to_string());

    let raw = extract_json_after_marker(html, CAPTIONS_MARKER).ok_or_else(disabled)?;
    let captions: Value = serde_json::from_str(raw).map_err(|e| {
        tracing::debug!("caption container failed to parse: {}", e);
        disabled()
    })?;

    captions
        .get("playerCaptionsTracklistRenderer")
        .cloned()
        .ok_or_else(|| disabled().into())
}

/// Extract descriptive metadata from the embedded player response.
pub fn extract_metadata(html: &str, video_id: &str) -> Result<VideoMetadata> {
    let raw = extract_json_after_marker(html, PLAYER_RESPONSE_MARKER)
        .ok_or_else(|| TranscriptError::VideoUnavailable(video_id.to_string()))?;
    let player: Value =
        serde_json::from_str(raw).context("player response is not valid JSON")?;

    let details = player
        .get("videoDetails")
        .ok_or_else(|| TranscriptError::VideoUnavailable(video_id.to_string()))?;
    let microformat = player
        .pointer("/microformat/playerMicroformatRenderer")
        .cloned()
        .unwrap_or(Value::Null);

    let str_field = |v: &Value, key: &str| -> String {
        v.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
    };
    let num_field = |v: &Value, key: &str| -> u64 {
        v.get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };

    let thumbnails = details
        .pointer("/thumbnail/thumbnails")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|t| {
                    Some(Thumbnail {
                        url: t.get("url")?.as_str()?.to_string(),
                        width: t.get("width")?.as_u64()? as u32,
                        height: t.get("height")?.as_u64()? as u32,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let keywords = details
        .get("keywords")
        .and_then(Value::as_array)
        .map(|k| {
            k.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });

    Ok(VideoMetadata {
        id: str_field(details, "videoId"),
        title: str_field(details, "title"),
        description: str_field(details, "shortDescription"),
        author: str_field(details, "author"),
        channel_id: str_field(details, "channelId"),
        length_seconds: num_field(details, "lengthSeconds"),
        view_count: num_field(details, "viewCount"),
        is_private: details
            .get("isPrivate")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        is_live_content: details
            .get("isLiveContent")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        publish_date: microformat
            .get("publishDate")
            .and_then(Value::as_str)
            .map(str::to_string),
        category: microformat
            .get("category")
            .and_then(Value::as_str)
            .map(str::to_string),
        keywords,
        thumbnails,
    })
}
