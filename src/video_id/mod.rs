use url::Url;

use crate::TranscriptError;

/// Hosts whose first path segment is the video id
const SHORT_LINK_HOSTS: &[&str] = &["youtu.be", "www.youtu.be"];

/// Hosts that use the canonical /watch?v= layout (plus /shorts/, /embed/, /live/)
const WATCH_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Path prefixes whose following segment is the video id
const SEGMENT_PREFIXES: &[&str] = &["shorts", "embed", "live"];

/// Resolve a raw reference (bare id or URL) to a canonical video identifier.
///
/// A string with no path separator and no dot is accepted as an id unchanged,
/// preserving the historical behavior of passing opaque id-like tokens
/// straight through. Anything else must parse as a recognized URL shape.
pub fn normalize(reference: &str) -> Result<String, TranscriptError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(TranscriptError::InvalidReference(reference.to_string()));
    }

    if !trimmed.contains('/') && !trimmed.contains('.') {
        return Ok(trimmed.to_string());
    }

    let parsed = parse_url(trimmed)
        .ok_or_else(|| TranscriptError::InvalidReference(reference.to_string()))?;

    let host = parsed.host_str().unwrap_or("");
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let id = if SHORT_LINK_HOSTS.contains(&host) {
        segments.first().map(|s| s.to_string())
    } else if WATCH_HOSTS.contains(&host) {
        extract_from_watch_host(&parsed, &segments)
    } else {
        None
    };

    match id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(TranscriptError::InvalidReference(reference.to_string())),
    }
}

/// Parse as an absolute URL, retrying with an https:// prefix for
/// scheme-less references like "youtube.com/watch?v=..."
fn parse_url(reference: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(reference) {
        return Some(url);
    }

    if !reference.contains("://") {
        return Url::parse(&format!("https://{}", reference)).ok();
    }

    None
}

fn extract_from_watch_host(url: &Url, segments: &[&str]) -> Option<String> {
    match segments.first() {
        Some(&"watch") => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned()),
        Some(first) if SEGMENT_PREFIXES.contains(first) => {
            segments.get(1).map(|s| s.to_string())
        }
        _ => None,
    }
}
