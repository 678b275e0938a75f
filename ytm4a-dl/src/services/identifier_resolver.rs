//! Identifier Resolver
//!
//! Extracts the video identifier from a user-supplied URL.
//!
//! # Rules
//! - The URL must parse, use http(s), and point at an accepted YouTube host
//! - Any `list=` marker (or a `/playlist` path) is rejected: single videos only
//! - Identifier patterns are tried in fixed priority order; first match wins
//!
//! Pure function of its input: no I/O, no shared state.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use tracing::debug;

use crate::error::PipelineError;
use crate::models::MediaIdentifier;

/// Hosts accepted as a video source
const ACCEPTED_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Query marker of a multi-item URL
const COLLECTION_MARKER: &str = "list=";

/// Identifier patterns in priority order. The token ends at `&`, `?`, `#` or
/// a newline.
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#/]+)",
        r"youtube\.com/v/([^&\n?#/]+)",
        r"youtube\.com/watch\?(?:[^#\n]*&)?v=([^&\n?#]+)",
        r"youtube\.com/shorts/([^&\n?#/]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("identifier pattern is valid"))
    .collect()
});

/// Resolve a raw URL into a `MediaIdentifier`
///
/// # Errors
/// - `InvalidSource`: not a URL, wrong scheme, foreign host, or no pattern match
/// - `UnsupportedCollection`: playlist URL
pub fn resolve(raw_url: &str) -> Result<MediaIdentifier, PipelineError> {
    let raw = raw_url.trim();
    if raw.is_empty() {
        return Err(PipelineError::InvalidSource("URL is empty".to_string()));
    }

    let parsed =
        Url::parse(raw).map_err(|e| PipelineError::InvalidSource(format!("{} ({})", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PipelineError::InvalidSource(raw.to_string()));
    }

    let host = parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_HOSTS.contains(&host.as_str()) {
        return Err(PipelineError::InvalidSource(raw.to_string()));
    }

    if is_collection(raw, &parsed) {
        return Err(PipelineError::UnsupportedCollection);
    }

    for (priority, pattern) in ID_PATTERNS.iter().enumerate() {
        if let Some(token) = pattern
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|token| !token.is_empty())
        {
            debug!(priority, id = token, "Resolved media identifier");
            return Ok(MediaIdentifier::new(token));
        }
    }

    Err(PipelineError::InvalidSource(raw.to_string()))
}

fn is_collection(raw: &str, parsed: &Url) -> bool {
    raw.contains(COLLECTION_MARKER) || parsed.path().trim_end_matches('/') == "/playlist"
}
